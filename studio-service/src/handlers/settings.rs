use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::UpdateSettingsRequest;
use crate::models::StudioSettings;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<StudioSettings>, AppError> {
    Ok(Json(state.studio.settings.get_settings().await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UpdateSettingsRequest>,
) -> Result<Json<StudioSettings>, AppError> {
    let settings = state.studio.settings.update_settings(req.into()).await?;
    Ok(Json(settings))
}
