//! Client profile handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{CreateClientRequest, UpdateClientRequest};
use crate::models::ClientView;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn create_client(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientView>), AppError> {
    let client = state.studio.clients.create_client(req.into()).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn list_clients(State(state): State<AppState>) -> Result<Json<Vec<ClientView>>, AppError> {
    Ok(Json(state.studio.clients.list_clients().await?))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ClientView>, AppError> {
    Ok(Json(state.studio.clients.get_client(client_id).await?))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateClientRequest>,
) -> Result<Json<ClientView>, AppError> {
    let client = state
        .studio
        .clients
        .update_client(client_id, req.into())
        .await?;
    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.studio.clients.delete_client(client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
