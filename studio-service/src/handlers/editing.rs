//! Editing workflow handlers: jobs and configurable statuses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{
    CreateEditingJobRequest, CreateEditingStatusRequest, EditingJobListQuery, MoveJobRequest,
    RevisionRequest, UpdateEditingJobRequest, UpdateEditingStatusRequest,
};
use crate::models::{EditingJob, EditingStatus};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn create_job(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateEditingJobRequest>,
) -> Result<(StatusCode, Json<EditingJob>), AppError> {
    let (booking_id, input) = req.into_parts();
    let job = state.studio.editing.create_job(booking_id, input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<EditingJobListQuery>,
) -> Result<Json<Vec<EditingJob>>, AppError> {
    let jobs = state.studio.editing.list_jobs(&query.into()).await?;
    Ok(Json(jobs))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<EditingJob>, AppError> {
    Ok(Json(state.studio.editing.get_job(job_id).await?))
}

pub async fn update_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateEditingJobRequest>,
) -> Result<Json<EditingJob>, AppError> {
    let job = state.studio.editing.update_job(job_id, req.into()).await?;
    Ok(Json(job))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.studio.editing.delete_job(job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move a job to another column.
pub async fn move_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<MoveJobRequest>,
) -> Result<Json<EditingJob>, AppError> {
    let job = state
        .studio
        .editing
        .update_status(job_id, req.status_id)
        .await?;
    Ok(Json(job))
}

pub async fn request_revision(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RevisionRequest>,
) -> Result<Json<EditingJob>, AppError> {
    let job = state
        .studio
        .editing
        .request_revision(job_id, &req.note)
        .await?;
    Ok(Json(job))
}

pub async fn list_statuses(
    State(state): State<AppState>,
) -> Result<Json<Vec<EditingStatus>>, AppError> {
    Ok(Json(state.studio.editing.list_statuses().await?))
}

pub async fn create_status(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateEditingStatusRequest>,
) -> Result<(StatusCode, Json<EditingStatus>), AppError> {
    let status = state.studio.editing.create_status(req.into()).await?;
    Ok((StatusCode::CREATED, Json(status)))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(status_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateEditingStatusRequest>,
) -> Result<Json<EditingStatus>, AppError> {
    let status = state
        .studio
        .editing
        .update_status_definition(status_id, req.into())
        .await?;
    Ok(Json(status))
}

pub async fn delete_status(
    State(state): State<AppState>,
    Path(status_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.studio.editing.delete_status(status_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
