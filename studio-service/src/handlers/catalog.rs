//! Session catalog and payment account handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{CreateCategoryRequest, CreatePackageRequest, CreatePaymentAccountRequest};
use crate::models::{PaymentAccount, SessionCategory, SessionPackage};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn create_category(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<SessionCategory>), AppError> {
    let category = state
        .studio
        .catalog
        .create_category(&req.name, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionCategory>>, AppError> {
    Ok(Json(state.studio.catalog.list_categories().await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.studio.catalog.delete_category(category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_package(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreatePackageRequest>,
) -> Result<(StatusCode, Json<SessionPackage>), AppError> {
    let package = state.studio.catalog.create_package(req.into()).await?;
    Ok((StatusCode::CREATED, Json(package)))
}

pub async fn list_packages(
    State(state): State<AppState>,
) -> Result<Json<Vec<SessionPackage>>, AppError> {
    Ok(Json(state.studio.catalog.list_packages().await?))
}

pub async fn delete_package(
    State(state): State<AppState>,
    Path(package_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.studio.catalog.delete_package(package_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_payment_account(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreatePaymentAccountRequest>,
) -> Result<(StatusCode, Json<PaymentAccount>), AppError> {
    let account = state
        .studio
        .catalog
        .create_payment_account(&req.name, req.details)
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn list_payment_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentAccount>>, AppError> {
    Ok(Json(state.studio.catalog.list_payment_accounts().await?))
}
