//! Bootstrap snapshot for the back-office UI.

use chrono::Utc;
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    Booking, BookingFilter, ClientView, EditingJob, EditingJobFilter, EditingStatus, Invoice,
    InvoiceFilter, PaymentAccount, SessionCategory, SessionPackage, StudioSettings,
};
use crate::services::clients::view;
use crate::services::money::{self, AgingSummary};
use crate::services::store::Store;
use crate::services::StudioPolicy;

/// Everything the UI needs on first load, read in one unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct StudioSnapshot {
    pub settings: StudioSettings,
    pub clients: Vec<ClientView>,
    pub bookings: Vec<Booking>,
    pub invoices: Vec<Invoice>,
    pub editing_jobs: Vec<EditingJob>,
    pub editing_statuses: Vec<EditingStatus>,
    pub session_categories: Vec<SessionCategory>,
    pub session_packages: Vec<SessionPackage>,
    pub payment_accounts: Vec<PaymentAccount>,
    pub aging: AgingSummary,
}

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn Store>,
    policy: StudioPolicy,
}

impl DashboardService {
    pub fn new(store: Arc<dyn Store>, policy: StudioPolicy) -> Self {
        Self { store, policy }
    }

    #[instrument(skip(self))]
    pub async fn snapshot(&self) -> Result<StudioSnapshot, AppError> {
        let mut uow = self.store.begin().await?;
        let settings = uow.get_settings().await?;
        let clients = uow.list_clients().await?;
        let bookings = uow.list_bookings(&BookingFilter::default()).await?;
        let invoices = uow.list_invoices(&InvoiceFilter::default()).await?;
        let editing_jobs = uow.list_editing_jobs(&EditingJobFilter::default()).await?;
        let editing_statuses = uow.list_editing_statuses().await?;
        let session_categories = uow.list_categories().await?;
        let session_packages = uow.list_packages().await?;
        let payment_accounts = uow.list_payment_accounts().await?;

        let clients = clients
            .into_iter()
            .map(|client| {
                let own: Vec<Invoice> = invoices
                    .iter()
                    .filter(|i| i.client_id == client.client_id)
                    .cloned()
                    .collect();
                view(client, &own, &self.policy)
            })
            .collect();
        let aging = money::aging_summary(&invoices, Utc::now().date_naive());

        Ok(StudioSnapshot {
            settings,
            clients,
            bookings,
            invoices,
            editing_jobs,
            editing_statuses,
            session_categories,
            session_packages,
            payment_accounts,
            aging,
        })
    }
}
