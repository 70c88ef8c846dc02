//! Booking lifecycle handlers, including photo selections.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{AddSelectionRequest, BookingListQuery, CreateBookingRequest, UpdateBookingRequest};
use crate::models::{Booking, EditingJob, Invoice};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn create_booking(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.studio.bookings.create_booking(req.into()).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state.studio.bookings.list_bookings(&query.into()).await?;
    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.studio.bookings.get_booking(booking_id).await?))
}

pub async fn update_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .studio
        .bookings
        .update_booking(booking_id, req.into())
        .await?;
    Ok(Json(booking))
}

/// Deletes the booking with its invoices, payments and editing job.
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.studio.bookings.delete_booking(booking_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Generate the invoice for a booking from its package price.
pub async fn invoice_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    let invoice = state.studio.ledger.create_from_booking(booking_id).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn add_selection(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AddSelectionRequest>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .studio
        .bookings
        .add_selection(booking_id, &req.name)
        .await?;
    Ok(Json(booking))
}

pub async fn remove_selection(
    State(state): State<AppState>,
    Path((booking_id, name)): Path<(Uuid, String)>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .studio
        .bookings
        .remove_selection(booking_id, &name)
        .await?;
    Ok(Json(booking))
}

pub async fn toggle_selection_edited(
    State(state): State<AppState>,
    Path((booking_id, name)): Path<(Uuid, String)>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .studio
        .bookings
        .toggle_selection_edited(booking_id, &name)
        .await?;
    Ok(Json(booking))
}

/// Client has finished picking photos; move the job to editing.
pub async fn finalize_selections(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<EditingJob>, AppError> {
    let job = state.studio.editing.finalize_selections(booking_id).await?;
    Ok(Json(job))
}
