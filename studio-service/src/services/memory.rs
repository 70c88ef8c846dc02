//! In-process store.
//!
//! A single async mutex guards the whole state, so units of work run strictly
//! one at a time. `begin` clones the state into a working copy and `commit`
//! swaps it back in; dropping the unit of work discards the copy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::{
    Booking, BookingFilter, BookingStatus, Client, EditingJob, EditingJobFilter, EditingStatus,
    Invoice, InvoiceFilter, InvoiceStatus, Payment, PaymentAccount, SessionCategory,
    SessionPackage, StudioSettings, WorkflowStage,
};
use crate::services::store::{Store, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    clients: HashMap<Uuid, Client>,
    categories: HashMap<Uuid, SessionCategory>,
    packages: HashMap<Uuid, SessionPackage>,
    accounts: HashMap<Uuid, PaymentAccount>,
    bookings: HashMap<Uuid, Booking>,
    invoices: HashMap<Uuid, Invoice>,
    payments: Vec<Payment>,
    statuses: HashMap<Uuid, EditingStatus>,
    jobs: HashMap<Uuid, EditingJob>,
    settings: StudioSettings,
}

/// Store backed by process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Empty store with no editing statuses configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the default editing workflow, matching the migration.
    pub fn with_default_workflow() -> Self {
        let now = Utc::now();
        let mut state = MemoryState::default();
        let defaults = [
            ("Awaiting Selection", "#f59e0b", WorkflowStage::AwaitingSelection),
            ("Ready for Edit", "#3b82f6", WorkflowStage::ReadyForEdit),
            ("In Progress", "#8b5cf6", WorkflowStage::InProgress),
            ("Client Review", "#ec4899", WorkflowStage::ClientReview),
            ("Completed", "#10b981", WorkflowStage::Completed),
        ];
        for (i, (name, color, stage)) in defaults.into_iter().enumerate() {
            let status = EditingStatus {
                status_id: Uuid::new_v4(),
                name: name.to_string(),
                color: color.to_string(),
                sort_order: (i as i32 + 1) * 10,
                stage: stage.as_str().to_string(),
                created_utc: now,
            };
            state.statuses.insert(status.status_id, status);
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn sorted_by<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(|r| key(r));
    rows
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn get_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        Ok(self.working.clients.get(&client_id).cloned())
    }

    async fn lock_client(&mut self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        self.get_client(client_id).await
    }

    async fn list_clients(&mut self) -> Result<Vec<Client>, AppError> {
        let rows = self.working.clients.values().cloned().collect();
        Ok(sorted_by(rows, |c: &Client| (c.name.clone(), c.client_id)))
    }

    async fn save_client(&mut self, client: &Client) -> Result<(), AppError> {
        self.working.clients.insert(client.client_id, client.clone());
        Ok(())
    }

    async fn delete_client(&mut self, client_id: Uuid) -> Result<bool, AppError> {
        if self.working.bookings.values().any(|b| b.client_id == client_id) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Client {} still has bookings",
                client_id
            )));
        }
        Ok(self.working.clients.remove(&client_id).is_some())
    }

    async fn get_category(
        &mut self,
        category_id: Uuid,
    ) -> Result<Option<SessionCategory>, AppError> {
        Ok(self.working.categories.get(&category_id).cloned())
    }

    async fn list_categories(&mut self) -> Result<Vec<SessionCategory>, AppError> {
        let rows = self.working.categories.values().cloned().collect();
        Ok(sorted_by(rows, |c: &SessionCategory| c.name.clone()))
    }

    async fn save_category(&mut self, category: &SessionCategory) -> Result<(), AppError> {
        self.working
            .categories
            .insert(category.category_id, category.clone());
        Ok(())
    }

    async fn delete_category(&mut self, category_id: Uuid) -> Result<bool, AppError> {
        Ok(self.working.categories.remove(&category_id).is_some())
    }

    async fn category_in_use(&mut self, category_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .working
            .bookings
            .values()
            .any(|b| b.session_category_id == category_id)
            || self
                .working
                .packages
                .values()
                .any(|p| p.category_id == category_id))
    }

    async fn get_package(&mut self, package_id: Uuid) -> Result<Option<SessionPackage>, AppError> {
        Ok(self.working.packages.get(&package_id).cloned())
    }

    async fn list_packages(&mut self) -> Result<Vec<SessionPackage>, AppError> {
        let rows = self.working.packages.values().cloned().collect();
        Ok(sorted_by(rows, |p: &SessionPackage| p.name.clone()))
    }

    async fn save_package(&mut self, package: &SessionPackage) -> Result<(), AppError> {
        self.working
            .packages
            .insert(package.package_id, package.clone());
        Ok(())
    }

    async fn delete_package(&mut self, package_id: Uuid) -> Result<bool, AppError> {
        Ok(self.working.packages.remove(&package_id).is_some())
    }

    async fn package_in_use(&mut self, package_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .working
            .bookings
            .values()
            .any(|b| b.session_package_id == package_id))
    }

    async fn get_payment_account(
        &mut self,
        account_id: Uuid,
    ) -> Result<Option<PaymentAccount>, AppError> {
        Ok(self.working.accounts.get(&account_id).cloned())
    }

    async fn list_payment_accounts(&mut self) -> Result<Vec<PaymentAccount>, AppError> {
        let rows = self.working.accounts.values().cloned().collect();
        Ok(sorted_by(rows, |a: &PaymentAccount| a.name.clone()))
    }

    async fn save_payment_account(&mut self, account: &PaymentAccount) -> Result<(), AppError> {
        self.working
            .accounts
            .insert(account.account_id, account.clone());
        Ok(())
    }

    async fn get_booking(&mut self, booking_id: Uuid) -> Result<Option<Booking>, AppError> {
        Ok(self.working.bookings.get(&booking_id).cloned())
    }

    async fn lock_booking(&mut self, booking_id: Uuid) -> Result<Option<Booking>, AppError> {
        self.get_booking(booking_id).await
    }

    async fn list_bookings(&mut self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let rows = self
            .working
            .bookings
            .values()
            .filter(|b| filter.client_id.map_or(true, |id| b.client_id == id))
            .filter(|b| filter.status.map_or(true, |s| b.status() == s))
            .filter(|b| filter.from.map_or(true, |from| b.session_date >= from))
            .filter(|b| filter.to.map_or(true, |to| b.session_date <= to))
            .cloned()
            .collect();
        Ok(sorted_by(rows, |b: &Booking| (b.session_date, b.booking_id)))
    }

    async fn save_booking(&mut self, booking: &Booking) -> Result<(), AppError> {
        if BookingStatus::parse(&booking.status).is_none() {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Failed to save booking: unknown status '{}'",
                booking.status
            )));
        }
        self.working
            .bookings
            .insert(booking.booking_id, booking.clone());
        Ok(())
    }

    async fn delete_booking(&mut self, booking_id: Uuid) -> Result<bool, AppError> {
        Ok(self.working.bookings.remove(&booking_id).is_some())
    }

    async fn get_invoice(&mut self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        Ok(self.working.invoices.get(&invoice_id).cloned())
    }

    async fn lock_invoice(&mut self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        self.get_invoice(invoice_id).await
    }

    async fn list_invoices(&mut self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, AppError> {
        let rows = self
            .working
            .invoices
            .values()
            .filter(|i| filter.client_id.map_or(true, |id| i.client_id == id))
            .filter(|i| filter.booking_id.map_or(true, |id| i.booking_id == id))
            .filter(|i| filter.status.map_or(true, |s| i.status() == s))
            .filter(|i| {
                filter.unpaid_due_before.map_or(true, |date| {
                    i.status() != InvoiceStatus::Paid && i.due_date < date
                })
            })
            .cloned()
            .collect();
        Ok(sorted_by(rows, |i: &Invoice| (i.issue_date, i.created_utc)))
    }

    async fn save_invoice(&mut self, invoice: &Invoice) -> Result<(), AppError> {
        let duplicate = self
            .working
            .invoices
            .values()
            .any(|i| i.booking_id == invoice.booking_id && i.invoice_id != invoice.invoice_id);
        if duplicate {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Booking {} already has an invoice",
                invoice.booking_id
            )));
        }
        self.working
            .invoices
            .insert(invoice.invoice_id, invoice.clone());
        Ok(())
    }

    async fn mark_reminder_sent(
        &mut self,
        invoice_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        Ok(match self.working.invoices.get_mut(&invoice_id) {
            Some(invoice) => {
                invoice.last_reminder_sent = Some(at);
                true
            }
            None => false,
        })
    }

    async fn delete_invoice(&mut self, invoice_id: Uuid) -> Result<bool, AppError> {
        if self.working.payments.iter().any(|p| p.invoice_id == invoice_id) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invoice {} still has payments",
                invoice_id
            )));
        }
        Ok(self.working.invoices.remove(&invoice_id).is_some())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), AppError> {
        self.working.payments.push(payment.clone());
        Ok(())
    }

    async fn list_payments(&mut self, invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
        Ok(self
            .working
            .payments
            .iter()
            .filter(|p| p.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn sum_payments(&mut self, invoice_id: Uuid) -> Result<Decimal, AppError> {
        Ok(self
            .working
            .payments
            .iter()
            .filter(|p| p.invoice_id == invoice_id)
            .map(|p| p.amount)
            .sum())
    }

    async fn delete_payments(&mut self, invoice_id: Uuid) -> Result<u64, AppError> {
        let before = self.working.payments.len();
        self.working.payments.retain(|p| p.invoice_id != invoice_id);
        Ok((before - self.working.payments.len()) as u64)
    }

    async fn get_editing_status(
        &mut self,
        status_id: Uuid,
    ) -> Result<Option<EditingStatus>, AppError> {
        Ok(self.working.statuses.get(&status_id).cloned())
    }

    async fn list_editing_statuses(&mut self) -> Result<Vec<EditingStatus>, AppError> {
        let rows = self.working.statuses.values().cloned().collect();
        Ok(sorted_by(rows, |s: &EditingStatus| (s.sort_order, s.created_utc)))
    }

    async fn save_editing_status(&mut self, status: &EditingStatus) -> Result<(), AppError> {
        self.working
            .statuses
            .insert(status.status_id, status.clone());
        Ok(())
    }

    async fn delete_editing_status(&mut self, status_id: Uuid) -> Result<bool, AppError> {
        Ok(self.working.statuses.remove(&status_id).is_some())
    }

    async fn editing_status_in_use(&mut self, status_id: Uuid) -> Result<bool, AppError> {
        Ok(self.working.jobs.values().any(|j| j.status_id == status_id))
    }

    async fn get_editing_job(&mut self, job_id: Uuid) -> Result<Option<EditingJob>, AppError> {
        Ok(self.working.jobs.get(&job_id).cloned())
    }

    async fn lock_editing_job(&mut self, job_id: Uuid) -> Result<Option<EditingJob>, AppError> {
        self.get_editing_job(job_id).await
    }

    async fn get_editing_job_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> Result<Option<EditingJob>, AppError> {
        Ok(self
            .working
            .jobs
            .values()
            .find(|j| j.booking_id == booking_id)
            .cloned())
    }

    async fn list_editing_jobs(
        &mut self,
        filter: &EditingJobFilter,
    ) -> Result<Vec<EditingJob>, AppError> {
        let rows = self
            .working
            .jobs
            .values()
            .filter(|j| filter.status_id.map_or(true, |id| j.status_id == id))
            .filter(|j| filter.editor_id.map_or(true, |id| j.editor_id == Some(id)))
            .filter(|j| filter.client_id.map_or(true, |id| j.client_id == id))
            .cloned()
            .collect();
        Ok(sorted_by(rows, |j: &EditingJob| (j.created_utc, j.job_id)))
    }

    async fn save_editing_job(&mut self, job: &EditingJob) -> Result<(), AppError> {
        let duplicate = self
            .working
            .jobs
            .values()
            .any(|j| j.booking_id == job.booking_id && j.job_id != job.job_id);
        if duplicate {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Booking {} already has an editing job",
                job.booking_id
            )));
        }
        self.working.jobs.insert(job.job_id, job.clone());
        Ok(())
    }

    async fn delete_editing_job(&mut self, job_id: Uuid) -> Result<bool, AppError> {
        Ok(self.working.jobs.remove(&job_id).is_some())
    }

    async fn get_settings(&mut self) -> Result<StudioSettings, AppError> {
        Ok(self.working.settings.clone())
    }

    async fn save_settings(&mut self, settings: &StudioSettings) -> Result<(), AppError> {
        self.working.settings = settings.clone();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(enabled: bool) -> StudioSettings {
        StudioSettings {
            studio_name: "Test".to_string(),
            automated_reminders_enabled: enabled,
            updated_utc: Utc::now(),
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() {
        let store = MemoryStore::new();

        let mut uow = store.begin().await.unwrap();
        uow.save_settings(&settings(true)).await.unwrap();
        drop(uow);

        let mut uow = store.begin().await.unwrap();
        assert!(!uow.get_settings().await.unwrap().automated_reminders_enabled);
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let store = MemoryStore::new();

        let mut uow = store.begin().await.unwrap();
        uow.save_settings(&settings(true)).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        assert!(uow.get_settings().await.unwrap().automated_reminders_enabled);
    }

    #[tokio::test]
    async fn unknown_booking_status_is_rejected() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let booking = Booking {
            booking_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            session_category_id: Uuid::new_v4(),
            session_package_id: Uuid::new_v4(),
            photographer_id: None,
            session_date: now,
            status: "archived".to_string(),
            invoice_id: None,
            notes: None,
            location: None,
            photo_selections: sqlx::types::Json(Vec::new()),
            created_utc: now,
            updated_utc: now,
        };

        let mut uow = store.begin().await.unwrap();
        let result = uow.save_booking(&booking).await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));
        assert!(uow.get_booking(booking.booking_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn default_workflow_is_ordered() {
        let store = MemoryStore::with_default_workflow();
        let mut uow = store.begin().await.unwrap();
        let statuses = uow.list_editing_statuses().await.unwrap();
        let stages: Vec<_> = statuses.iter().map(|s| s.stage()).collect();
        assert_eq!(
            stages,
            vec![
                WorkflowStage::AwaitingSelection,
                WorkflowStage::ReadyForEdit,
                WorkflowStage::InProgress,
                WorkflowStage::ClientReview,
                WorkflowStage::Completed,
            ]
        );
    }
}
