//! Invoice ledger.
//!
//! Owns invoice creation, item edits, payments and deletion. `amount`,
//! `amount_paid` and `status` are re-derived from items and the payment rows on
//! every write, in the same unit of work, and the client's cached stats are
//! refreshed before commit.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::types::Json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    CreateInvoice, Invoice, InvoiceDetails, InvoiceFilter, InvoiceItem, InvoiceStatus, Payment,
    RecordPayment, UpdateInvoice,
};
use crate::services::client_stats;
use crate::services::metrics::{INVOICES_CREATED_TOTAL, PAYMENTS_TOTAL, PAYMENT_AMOUNT_TOTAL};
use crate::services::money::{self, AgingSummary};
use crate::services::store::{Store, UnitOfWork};
use crate::services::StudioPolicy;

/// Recompute the cached amount (unless overridden) and the status.
pub(crate) fn settle(invoice: &mut Invoice, today: NaiveDate) {
    if !invoice.amount_overridden {
        invoice.amount = money::compute_amount(&invoice.items);
    }
    invoice.status = money::compute_status(
        invoice.amount,
        invoice.amount_paid,
        invoice.due_date,
        today,
    )
    .as_str()
    .to_string();
}

fn not_found(invoice_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id))
}

fn check_override(amount: Option<Decimal>) -> Result<(), AppError> {
    match amount {
        Some(a) if a < Decimal::ZERO => Err(AppError::Invalid(anyhow::anyhow!(
            "Amount override must not be negative"
        ))),
        _ => Ok(()),
    }
}

/// Build and persist the invoice for a booking from its session package.
///
/// Locks the booking row and sets its `invoice_id`.
pub(crate) async fn create_from_booking_in(
    uow: &mut dyn UnitOfWork,
    booking_id: Uuid,
    policy: &StudioPolicy,
) -> Result<Invoice, AppError> {
    let mut booking = uow
        .lock_booking(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking {} not found", booking_id)))?;
    if booking.has_invoice() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Booking {} already has an invoice",
            booking_id
        )));
    }
    uow.lock_client(booking.client_id).await?;
    let package = uow
        .get_package(booking.session_package_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "Session package {} not found",
                booking.session_package_id
            ))
        })?;

    let now = Utc::now();
    let today = now.date_naive();
    let mut invoice = Invoice {
        invoice_id: Uuid::new_v4(),
        booking_id,
        client_id: booking.client_id,
        items: Json(vec![InvoiceItem {
            description: format!("{} session", package.name),
            quantity: 1,
            unit_price: package.price,
        }]),
        amount: Decimal::ZERO,
        amount_overridden: false,
        amount_paid: Decimal::ZERO,
        issue_date: today,
        due_date: today + Duration::days(policy.payment_terms_days),
        status: InvoiceStatus::Sent.as_str().to_string(),
        last_reminder_sent: None,
        created_utc: now,
        updated_utc: now,
    };
    settle(&mut invoice, today);
    uow.save_invoice(&invoice).await?;

    booking.invoice_id = Some(invoice.invoice_id);
    booking.updated_utc = now;
    uow.save_booking(&booking).await?;

    INVOICES_CREATED_TOTAL.with_label_values(&["booking"]).inc();
    info!(
        invoice_id = %invoice.invoice_id,
        booking_id = %booking_id,
        amount = %invoice.amount,
        "Invoice created from booking"
    );
    Ok(invoice)
}

/// Remove an invoice and its payments. Leaves the booking reference to the caller.
pub(crate) async fn purge_in(uow: &mut dyn UnitOfWork, invoice_id: Uuid) -> Result<u64, AppError> {
    let removed = uow.delete_payments(invoice_id).await?;
    uow.delete_invoice(invoice_id).await?;
    Ok(removed)
}

/// Invoice ledger service.
#[derive(Clone)]
pub struct InvoiceLedger {
    store: Arc<dyn Store>,
    policy: StudioPolicy,
}

impl InvoiceLedger {
    pub fn new(store: Arc<dyn Store>, policy: StudioPolicy) -> Self {
        Self { store, policy }
    }

    /// Invoice a booking at its package price.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn create_from_booking(&self, booking_id: Uuid) -> Result<Invoice, AppError> {
        let mut uow = self.store.begin().await?;
        let invoice = create_from_booking_in(uow.as_mut(), booking_id, &self.policy).await?;
        client_stats::refresh_in(uow.as_mut(), invoice.client_id).await?;
        uow.commit().await?;
        Ok(invoice)
    }

    /// Invoice a booking with explicit items.
    #[instrument(skip(self, input), fields(booking_id = %input.booking_id))]
    pub async fn create_invoice(&self, input: CreateInvoice) -> Result<Invoice, AppError> {
        money::validate_items(&input.items)?;
        check_override(input.amount_override)?;

        let mut uow = self.store.begin().await?;
        let mut booking = uow.lock_booking(input.booking_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Booking {} not found", input.booking_id))
        })?;
        if booking.has_invoice() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Booking {} already has an invoice",
                input.booking_id
            )));
        }
        uow.lock_client(booking.client_id).await?;

        let now = Utc::now();
        let today = now.date_naive();
        let issue_date = input.issue_date.unwrap_or(today);
        let due_date = input
            .due_date
            .unwrap_or(issue_date + Duration::days(self.policy.payment_terms_days));
        if due_date < issue_date {
            return Err(AppError::Invalid(anyhow::anyhow!(
                "Due date {} is before issue date {}",
                due_date,
                issue_date
            )));
        }

        let mut invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            booking_id: booking.booking_id,
            client_id: booking.client_id,
            items: Json(input.items),
            amount: input.amount_override.unwrap_or_default(),
            amount_overridden: input.amount_override.is_some(),
            amount_paid: Decimal::ZERO,
            issue_date,
            due_date,
            status: InvoiceStatus::Sent.as_str().to_string(),
            last_reminder_sent: None,
            created_utc: now,
            updated_utc: now,
        };
        settle(&mut invoice, today);
        uow.save_invoice(&invoice).await?;

        booking.invoice_id = Some(invoice.invoice_id);
        booking.updated_utc = now;
        uow.save_booking(&booking).await?;

        client_stats::refresh_in(uow.as_mut(), invoice.client_id).await?;
        uow.commit().await?;

        INVOICES_CREATED_TOTAL.with_label_values(&["manual"]).inc();
        info!(
            invoice_id = %invoice.invoice_id,
            amount = %invoice.amount,
            status = %invoice.status,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Invoice with its payments in insertion order.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<InvoiceDetails, AppError> {
        let mut uow = self.store.begin().await?;
        let invoice = uow
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| not_found(invoice_id))?;
        let payments = uow.list_payments(invoice_id).await?;
        Ok(InvoiceDetails { invoice, payments })
    }

    #[instrument(skip(self, filter))]
    pub async fn list_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, AppError> {
        let mut uow = self.store.begin().await?;
        uow.list_invoices(filter).await
    }

    /// Replace the full item set. Clears any amount override.
    #[instrument(skip(self, items), fields(invoice_id = %invoice_id, items = items.len()))]
    pub async fn update_items(
        &self,
        invoice_id: Uuid,
        items: Vec<InvoiceItem>,
    ) -> Result<Invoice, AppError> {
        money::validate_items(&items)?;

        let mut uow = self.store.begin().await?;
        let mut invoice = uow
            .lock_invoice(invoice_id)
            .await?
            .ok_or_else(|| not_found(invoice_id))?;

        let now = Utc::now();
        invoice.items = Json(items);
        invoice.amount_overridden = false;
        invoice.amount_paid = uow.sum_payments(invoice_id).await?;
        settle(&mut invoice, now.date_naive());
        invoice.updated_utc = now;
        uow.save_invoice(&invoice).await?;

        client_stats::refresh_in(uow.as_mut(), invoice.client_id).await?;
        uow.commit().await?;

        info!(amount = %invoice.amount, status = %invoice.status, "Invoice items replaced");
        Ok(invoice)
    }

    /// Change the due date or the amount override.
    #[instrument(skip(self, patch), fields(invoice_id = %invoice_id))]
    pub async fn update_invoice(
        &self,
        invoice_id: Uuid,
        patch: UpdateInvoice,
    ) -> Result<Invoice, AppError> {
        check_override(patch.amount_override)?;

        let mut uow = self.store.begin().await?;
        let mut invoice = uow
            .lock_invoice(invoice_id)
            .await?
            .ok_or_else(|| not_found(invoice_id))?;

        if let Some(due_date) = patch.due_date {
            if due_date < invoice.issue_date {
                return Err(AppError::Invalid(anyhow::anyhow!(
                    "Due date {} is before issue date {}",
                    due_date,
                    invoice.issue_date
                )));
            }
            invoice.due_date = due_date;
        }
        if patch.clear_override {
            invoice.amount_overridden = false;
        } else if let Some(amount) = patch.amount_override {
            invoice.amount = amount;
            invoice.amount_overridden = true;
        }

        let now = Utc::now();
        invoice.amount_paid = uow.sum_payments(invoice_id).await?;
        settle(&mut invoice, now.date_naive());
        invoice.updated_utc = now;
        uow.save_invoice(&invoice).await?;

        client_stats::refresh_in(uow.as_mut(), invoice.client_id).await?;
        uow.commit().await?;

        info!(
            amount = %invoice.amount,
            due_date = %invoice.due_date,
            status = %invoice.status,
            "Invoice updated"
        );
        Ok(invoice)
    }

    /// Record a payment against an invoice.
    ///
    /// Overpayment is accepted. `amount_paid` is re-read as the sum of the
    /// payment rows after the insert, under the invoice row lock.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id, amount = %input.amount))]
    pub async fn apply_payment(
        &self,
        invoice_id: Uuid,
        input: RecordPayment,
    ) -> Result<InvoiceDetails, AppError> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::Invalid(anyhow::anyhow!(
                "Payment amount must be positive, got {}",
                input.amount
            )));
        }

        let mut uow = self.store.begin().await?;
        let mut invoice = uow
            .lock_invoice(invoice_id)
            .await?
            .ok_or_else(|| not_found(invoice_id))?;
        let account = uow
            .get_payment_account(input.account_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "Payment account {} not found",
                    input.account_id
                ))
            })?;

        let now = Utc::now();
        let today = now.date_naive();
        let payment = Payment {
            payment_id: Uuid::new_v4(),
            invoice_id,
            payment_date: input.payment_date.unwrap_or(today),
            amount: input.amount,
            account_id: account.account_id,
            method_notes: input.method_notes,
            recorded_by: input.recorded_by,
            created_utc: now,
        };
        uow.insert_payment(&payment).await?;

        invoice.amount_paid = uow.sum_payments(invoice_id).await?;
        settle(&mut invoice, today);
        invoice.updated_utc = now;
        uow.save_invoice(&invoice).await?;

        client_stats::refresh_in(uow.as_mut(), invoice.client_id).await?;
        let payments = uow.list_payments(invoice_id).await?;
        uow.commit().await?;

        PAYMENTS_TOTAL
            .with_label_values(&[invoice.status.as_str()])
            .inc();
        if let Some(amount) = payment.amount.to_f64() {
            PAYMENT_AMOUNT_TOTAL
                .with_label_values(&[account.name.as_str()])
                .inc_by(amount);
        }
        info!(
            payment_id = %payment.payment_id,
            amount_paid = %invoice.amount_paid,
            status = %invoice.status,
            "Payment applied"
        );
        Ok(InvoiceDetails { invoice, payments })
    }

    /// Delete an invoice and its payments; the booking becomes uninvoiced.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        let booking_id = uow
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| not_found(invoice_id))?
            .booking_id;

        let booking = uow.lock_booking(booking_id).await?;
        let invoice = uow
            .lock_invoice(invoice_id)
            .await?
            .ok_or_else(|| not_found(invoice_id))?;

        let payments_removed = purge_in(uow.as_mut(), invoice_id).await?;
        if let Some(mut booking) = booking.filter(|b| b.invoice_id == Some(invoice_id)) {
            booking.invoice_id = None;
            booking.updated_utc = Utc::now();
            uow.save_booking(&booking).await?;
        }

        client_stats::refresh_in(uow.as_mut(), invoice.client_id).await?;
        uow.commit().await?;

        info!(payments_removed = payments_removed, "Invoice deleted");
        Ok(())
    }

    /// Outstanding balances of unpaid invoices by days past due.
    #[instrument(skip(self))]
    pub async fn aging_report(&self, today: NaiveDate) -> Result<AgingSummary, AppError> {
        let mut uow = self.store.begin().await?;
        let invoices = uow.list_invoices(&InvoiceFilter::default()).await?;
        Ok(money::aging_summary(&invoices, today))
    }
}
