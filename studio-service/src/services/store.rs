//! Storage seam for the studio engine.
//!
//! Every engine operation opens one [`UnitOfWork`], does all of its reads,
//! writes and cache recomputation through it, and commits once. Dropping a
//! unit of work without committing discards everything it wrote.
//!
//! `lock_*` reads take a row lock that is held until commit or rollback, so
//! two writers touching the same invoice, booking, job or client serialize.
//! Lock order is booking, invoice, editing job, client.
//!
//! Inserting a row that references a client (booking, invoice, editing job)
//! holds a key-share lock on the client row until commit, which blocks every
//! other writer's `lock_client`. Such units of work must call `lock_client`
//! before the insert, never after.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    Booking, BookingFilter, Client, EditingJob, EditingJobFilter, EditingStatus, Invoice,
    InvoiceFilter, Payment, PaymentAccount, SessionCategory, SessionPackage, StudioSettings,
};

/// Source of units of work.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction-scoped unit of work.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> Result<(), AppError>;
}

/// Transaction-scoped access to studio entities.
///
/// `save_*` methods insert or fully overwrite a row by primary key.
#[async_trait]
pub trait UnitOfWork: Send {
    // Clients
    async fn get_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError>;
    async fn lock_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError>;
    async fn list_clients(&mut self) -> Result<Vec<Client>, AppError>;
    async fn save_client(&mut self, client: &Client) -> Result<(), AppError>;
    async fn delete_client(&mut self, client_id: Uuid) -> Result<bool, AppError>;

    // Catalog
    async fn get_category(&mut self, category_id: Uuid)
        -> Result<Option<SessionCategory>, AppError>;
    async fn list_categories(&mut self) -> Result<Vec<SessionCategory>, AppError>;
    async fn save_category(&mut self, category: &SessionCategory) -> Result<(), AppError>;
    async fn delete_category(&mut self, category_id: Uuid) -> Result<bool, AppError>;
    /// Whether any booking or package references the category.
    async fn category_in_use(&mut self, category_id: Uuid) -> Result<bool, AppError>;

    async fn get_package(&mut self, package_id: Uuid) -> Result<Option<SessionPackage>, AppError>;
    async fn list_packages(&mut self) -> Result<Vec<SessionPackage>, AppError>;
    async fn save_package(&mut self, package: &SessionPackage) -> Result<(), AppError>;
    async fn delete_package(&mut self, package_id: Uuid) -> Result<bool, AppError>;
    /// Whether any booking references the package.
    async fn package_in_use(&mut self, package_id: Uuid) -> Result<bool, AppError>;

    async fn get_payment_account(
        &mut self,
        account_id: Uuid,
    ) -> Result<Option<PaymentAccount>, AppError>;
    async fn list_payment_accounts(&mut self) -> Result<Vec<PaymentAccount>, AppError>;
    async fn save_payment_account(&mut self, account: &PaymentAccount) -> Result<(), AppError>;

    // Bookings
    async fn get_booking(&mut self, booking_id: Uuid) -> Result<Option<Booking>, AppError>;
    async fn lock_booking(&mut self, booking_id: Uuid) -> Result<Option<Booking>, AppError>;
    async fn list_bookings(&mut self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError>;
    async fn save_booking(&mut self, booking: &Booking) -> Result<(), AppError>;
    async fn delete_booking(&mut self, booking_id: Uuid) -> Result<bool, AppError>;

    // Invoices
    async fn get_invoice(&mut self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError>;
    async fn lock_invoice(&mut self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError>;
    async fn list_invoices(&mut self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, AppError>;
    async fn save_invoice(&mut self, invoice: &Invoice) -> Result<(), AppError>;
    /// Narrow write of the reminder timestamp; leaves every other column alone.
    async fn mark_reminder_sent(
        &mut self,
        invoice_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError>;
    /// Delete the invoice row. Payments must be deleted first.
    async fn delete_invoice(&mut self, invoice_id: Uuid) -> Result<bool, AppError>;

    // Payments
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), AppError>;
    /// Payments for an invoice in insertion order.
    async fn list_payments(&mut self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError>;
    /// Authoritative sum of committed payments for an invoice.
    async fn sum_payments(&mut self, invoice_id: Uuid) -> Result<Decimal, AppError>;
    async fn delete_payments(&mut self, invoice_id: Uuid) -> Result<u64, AppError>;

    // Editing statuses
    async fn get_editing_status(
        &mut self,
        status_id: Uuid,
    ) -> Result<Option<EditingStatus>, AppError>;
    /// All statuses ordered by `sort_order`.
    async fn list_editing_statuses(&mut self) -> Result<Vec<EditingStatus>, AppError>;
    async fn save_editing_status(&mut self, status: &EditingStatus) -> Result<(), AppError>;
    async fn delete_editing_status(&mut self, status_id: Uuid) -> Result<bool, AppError>;
    /// Whether any editing job currently sits in the status.
    async fn editing_status_in_use(&mut self, status_id: Uuid) -> Result<bool, AppError>;

    // Editing jobs
    async fn get_editing_job(&mut self, job_id: Uuid) -> Result<Option<EditingJob>, AppError>;
    async fn lock_editing_job(&mut self, job_id: Uuid) -> Result<Option<EditingJob>, AppError>;
    async fn get_editing_job_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> Result<Option<EditingJob>, AppError>;
    async fn list_editing_jobs(
        &mut self,
        filter: &EditingJobFilter,
    ) -> Result<Vec<EditingJob>, AppError>;
    async fn save_editing_job(&mut self, job: &EditingJob) -> Result<(), AppError>;
    async fn delete_editing_job(&mut self, job_id: Uuid) -> Result<bool, AppError>;

    // Settings
    async fn get_settings(&mut self) -> Result<StudioSettings, AppError>;
    async fn save_settings(&mut self, settings: &StudioSettings) -> Result<(), AppError>;

    /// Make every write of this unit of work durable.
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
