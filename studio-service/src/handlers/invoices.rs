//! Invoice ledger handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{
    AgingQuery, CreateInvoiceRequest, InvoiceListQuery, RecordPaymentRequest, ReplaceItemsRequest,
    UpdateInvoiceRequest,
};
use crate::models::{Invoice, InvoiceDetails};
use crate::services::money::AgingSummary;
use crate::services::ReminderRunSummary;
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn create_invoice(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    let invoice = state.studio.ledger.create_invoice(req.into()).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let invoices = state.studio.ledger.list_invoices(&query.into()).await?;
    Ok(Json(invoices))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceDetails>, AppError> {
    Ok(Json(state.studio.ledger.get_invoice(invoice_id).await?))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    Json(req): Json<UpdateInvoiceRequest>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state
        .studio
        .ledger
        .update_invoice(invoice_id, req.into())
        .await?;
    Ok(Json(invoice))
}

pub async fn replace_items(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ReplaceItemsRequest>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state
        .studio
        .ledger
        .update_items(invoice_id, req.items)
        .await?;
    Ok(Json(invoice))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.studio.ledger.delete_invoice(invoice_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<InvoiceDetails>), AppError> {
    tracing::info!(invoice_id = %invoice_id, amount = %req.amount, "Recording payment");
    let details = state
        .studio
        .ledger
        .apply_payment(invoice_id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// Send a payment reminder now, ignoring the resend window.
pub async fn send_reminder(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state.studio.reminders.remind_invoice(invoice_id).await?;
    Ok(Json(invoice))
}

/// Run one reminder scan immediately.
pub async fn run_reminders(
    State(state): State<AppState>,
) -> Result<Json<ReminderRunSummary>, AppError> {
    Ok(Json(state.studio.reminders.run_once().await?))
}

pub async fn aging_report(
    State(state): State<AppState>,
    Query(query): Query<AgingQuery>,
) -> Result<Json<AgingSummary>, AppError> {
    let today = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.studio.ledger.aging_report(today).await?))
}
