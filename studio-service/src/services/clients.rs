//! Client profiles.

use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    BookingFilter, Client, ClientView, CreateClient, Invoice, InvoiceFilter, UpdateClient,
};
use crate::services::client_stats;
use crate::services::store::Store;
use crate::services::StudioPolicy;

fn not_found(client_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Client {} not found", client_id))
}

fn require_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Invalid(anyhow::anyhow!(
            "Client name must not be empty"
        )));
    }
    Ok(name.to_string())
}

/// Attach the derived financial status to a client.
pub(crate) fn view(client: Client, invoices: &[Invoice], policy: &StudioPolicy) -> ClientView {
    let financial_status = client_stats::derive_financial_status(
        client.total_spent,
        invoices,
        policy.high_value_threshold,
        Utc::now().date_naive(),
    );
    ClientView {
        client,
        financial_status,
    }
}

/// Client profile service.
#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn Store>,
    policy: StudioPolicy,
}

impl ClientService {
    pub fn new(store: Arc<dyn Store>, policy: StudioPolicy) -> Self {
        Self { store, policy }
    }

    #[instrument(skip(self, input))]
    pub async fn create_client(&self, input: CreateClient) -> Result<ClientView, AppError> {
        let name = require_name(&input.name)?;
        let now = Utc::now();
        let client = Client {
            client_id: Uuid::new_v4(),
            name,
            phone: input.phone,
            email: input.email,
            join_date: input.join_date.unwrap_or_else(|| now.date_naive()),
            total_bookings: 0,
            total_spent: Decimal::ZERO,
            notes: input.notes,
            created_utc: now,
            updated_utc: now,
        };

        let mut uow = self.store.begin().await?;
        uow.save_client(&client).await?;
        uow.commit().await?;

        info!(client_id = %client.client_id, "Client created");
        Ok(view(client, &[], &self.policy))
    }

    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn get_client(&self, client_id: Uuid) -> Result<ClientView, AppError> {
        let mut uow = self.store.begin().await?;
        let client = uow
            .get_client(client_id)
            .await?
            .ok_or_else(|| not_found(client_id))?;
        let invoices = uow
            .list_invoices(&InvoiceFilter {
                client_id: Some(client_id),
                ..Default::default()
            })
            .await?;
        Ok(view(client, &invoices, &self.policy))
    }

    #[instrument(skip(self))]
    pub async fn list_clients(&self) -> Result<Vec<ClientView>, AppError> {
        let mut uow = self.store.begin().await?;
        let clients = uow.list_clients().await?;
        let invoices = uow.list_invoices(&InvoiceFilter::default()).await?;
        Ok(clients
            .into_iter()
            .map(|client| {
                let own: Vec<Invoice> = invoices
                    .iter()
                    .filter(|i| i.client_id == client.client_id)
                    .cloned()
                    .collect();
                view(client, &own, &self.policy)
            })
            .collect())
    }

    /// Update profile fields. Cached aggregates are recomputed, never patched.
    #[instrument(skip(self, patch), fields(client_id = %client_id))]
    pub async fn update_client(
        &self,
        client_id: Uuid,
        patch: UpdateClient,
    ) -> Result<ClientView, AppError> {
        let mut uow = self.store.begin().await?;
        let mut client = uow
            .lock_client(client_id)
            .await?
            .ok_or_else(|| not_found(client_id))?;

        if let Some(name) = patch.name {
            client.name = require_name(&name)?;
        }
        if let Some(phone) = patch.phone {
            client.phone = Some(phone);
        }
        if let Some(email) = patch.email {
            client.email = Some(email);
        }
        if let Some(notes) = patch.notes {
            client.notes = Some(notes);
        }
        client.updated_utc = Utc::now();
        uow.save_client(&client).await?;

        let client = client_stats::refresh_in(uow.as_mut(), client_id)
            .await?
            .unwrap_or(client);
        let invoices = uow
            .list_invoices(&InvoiceFilter {
                client_id: Some(client_id),
                ..Default::default()
            })
            .await?;
        uow.commit().await?;
        Ok(view(client, &invoices, &self.policy))
    }

    /// Delete a client without bookings.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn delete_client(&self, client_id: Uuid) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        if uow.lock_client(client_id).await?.is_none() {
            return Err(not_found(client_id));
        }
        let bookings = uow
            .list_bookings(&BookingFilter {
                client_id: Some(client_id),
                ..Default::default()
            })
            .await?;
        if !bookings.is_empty() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Client {} still has {} booking(s)",
                client_id,
                bookings.len()
            )));
        }
        uow.delete_client(client_id).await?;
        uow.commit().await?;
        info!("Client deleted");
        Ok(())
    }
}
