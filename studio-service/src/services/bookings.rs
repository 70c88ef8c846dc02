//! Booking lifecycle.
//!
//! Status transitions drive the side effects: moving into Completed opens the
//! editing job, and every write refreshes the client's cached stats in the
//! same unit of work.

use chrono::Utc;
use service_core::error::AppError;
use sqlx::types::Json;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::models::{
    Booking, BookingFilter, BookingStatus, CreateBooking, InvoiceFilter, SessionPackage,
    UpdateBooking,
};
use crate::services::metrics::BOOKING_TRANSITIONS_TOTAL;
use crate::services::store::{Store, UnitOfWork};
use crate::services::{client_stats, editing, ledger};

fn not_found(booking_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Booking {} not found", booking_id))
}

/// Resolve the category and package and check they belong together.
async fn check_catalog(
    uow: &mut dyn UnitOfWork,
    category_id: Uuid,
    package_id: Uuid,
) -> Result<SessionPackage, AppError> {
    if uow.get_category(category_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Session category {} not found",
            category_id
        )));
    }
    let package = uow.get_package(package_id).await?.ok_or_else(|| {
        AppError::NotFound(anyhow::anyhow!("Session package {} not found", package_id))
    })?;
    if package.category_id != category_id {
        return Err(AppError::Invalid(anyhow::anyhow!(
            "Package {} does not belong to category {}",
            package_id,
            category_id
        )));
    }
    Ok(package)
}

/// Booking lifecycle service.
#[derive(Clone)]
pub struct BookingController {
    store: Arc<dyn Store>,
}

impl BookingController {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Schedule a booking. A booking created as Completed gets its editing job
    /// straight away.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create_booking(&self, input: CreateBooking) -> Result<Booking, AppError> {
        let status = input.status.unwrap_or(BookingStatus::Pending);
        if status == BookingStatus::Cancelled {
            return Err(AppError::Invalid(anyhow::anyhow!(
                "A booking cannot be created as cancelled"
            )));
        }

        let mut uow = self.store.begin().await?;
        if uow.lock_client(input.client_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Client {} not found",
                input.client_id
            )));
        }
        check_catalog(
            uow.as_mut(),
            input.session_category_id,
            input.session_package_id,
        )
        .await?;

        let now = Utc::now();
        let booking = Booking {
            booking_id: Uuid::new_v4(),
            client_id: input.client_id,
            session_category_id: input.session_category_id,
            session_package_id: input.session_package_id,
            photographer_id: input.photographer_id,
            session_date: input.session_date,
            status: status.as_str().to_string(),
            invoice_id: None,
            notes: input.notes,
            location: input.location,
            photo_selections: Json(Vec::new()),
            created_utc: now,
            updated_utc: now,
        };
        uow.save_booking(&booking).await?;

        if status == BookingStatus::Completed {
            editing::ensure_job_in(uow.as_mut(), &booking).await?;
        }
        client_stats::refresh_in(uow.as_mut(), booking.client_id).await?;
        uow.commit().await?;

        info!(booking_id = %booking.booking_id, status = %booking.status, "Booking created");
        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, AppError> {
        let mut uow = self.store.begin().await?;
        uow.get_booking(booking_id)
            .await?
            .ok_or_else(|| not_found(booking_id))
    }

    pub async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let mut uow = self.store.begin().await?;
        uow.list_bookings(filter).await
    }

    /// Patch a booking and apply its status transition.
    ///
    /// The editing job is only created on the edge into Completed; re-saving a
    /// completed booking never opens a second one.
    #[instrument(skip(self, patch), fields(booking_id = %booking_id))]
    pub async fn update_booking(
        &self,
        booking_id: Uuid,
        patch: UpdateBooking,
    ) -> Result<Booking, AppError> {
        let mut uow = self.store.begin().await?;
        let mut booking = uow
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| not_found(booking_id))?;
        uow.lock_client(booking.client_id).await?;

        let previous = booking.status();
        let next = patch.status.unwrap_or(previous);
        if !previous.can_transition_to(next) {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "Booking cannot move from {} to {}",
                previous.as_str(),
                next.as_str()
            )));
        }

        if patch.session_category_id.is_some() || patch.session_package_id.is_some() {
            let category_id = patch
                .session_category_id
                .unwrap_or(booking.session_category_id);
            let package_id = patch
                .session_package_id
                .unwrap_or(booking.session_package_id);
            check_catalog(uow.as_mut(), category_id, package_id).await?;
            booking.session_category_id = category_id;
            booking.session_package_id = package_id;
        }
        if let Some(photographer_id) = patch.photographer_id {
            booking.photographer_id = Some(photographer_id);
        }
        if let Some(session_date) = patch.session_date {
            booking.session_date = session_date;
        }
        if let Some(notes) = patch.notes {
            booking.notes = Some(notes);
        }
        if let Some(location) = patch.location {
            booking.location = Some(location);
        }
        booking.status = next.as_str().to_string();
        booking.updated_utc = Utc::now();
        uow.save_booking(&booking).await?;

        if previous != BookingStatus::Completed && next == BookingStatus::Completed {
            editing::ensure_job_in(uow.as_mut(), &booking).await?;
        }
        client_stats::refresh_in(uow.as_mut(), booking.client_id).await?;
        uow.commit().await?;

        if previous != next {
            BOOKING_TRANSITIONS_TOTAL
                .with_label_values(&[previous.as_str(), next.as_str()])
                .inc();
            info!(from = previous.as_str(), to = next.as_str(), "Booking status changed");
        }
        Ok(booking)
    }

    /// Delete a booking with its invoice, payments and editing job, then
    /// refresh the client's stats. All in one unit of work.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn delete_booking(&self, booking_id: Uuid) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        let booking = uow
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| not_found(booking_id))?;

        let mut invoices = uow
            .list_invoices(&InvoiceFilter {
                booking_id: Some(booking_id),
                ..Default::default()
            })
            .await?;
        if let Some(invoice_id) = booking.invoice_id {
            if !invoices.iter().any(|i| i.invoice_id == invoice_id) {
                invoices.extend(uow.get_invoice(invoice_id).await?);
            }
        }
        for invoice in &invoices {
            uow.lock_invoice(invoice.invoice_id).await?;
            let payments = ledger::purge_in(uow.as_mut(), invoice.invoice_id).await?;
            debug!(invoice_id = %invoice.invoice_id, payments = payments, "Invoice removed");
        }

        if let Some(job) = uow.get_editing_job_for_booking(booking_id).await? {
            uow.lock_editing_job(job.job_id).await?;
            uow.delete_editing_job(job.job_id).await?;
            debug!(job_id = %job.job_id, "Editing job removed");
        }

        uow.delete_booking(booking_id).await?;
        client_stats::refresh_in(uow.as_mut(), booking.client_id).await?;
        uow.commit().await?;

        info!(invoices_removed = invoices.len(), "Booking deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Photo selections
    // -------------------------------------------------------------------------

    async fn edit_selections<F, T>(&self, booking_id: Uuid, edit: F) -> Result<(Booking, T), AppError>
    where
        F: FnOnce(&mut Booking) -> Result<(bool, T), AppError> + Send,
        T: Send,
    {
        let mut uow = self.store.begin().await?;
        let mut booking = uow
            .lock_booking(booking_id)
            .await?
            .ok_or_else(|| not_found(booking_id))?;
        let (changed, out) = edit(&mut booking)?;
        if changed {
            booking.updated_utc = Utc::now();
            uow.save_booking(&booking).await?;
            uow.commit().await?;
        }
        Ok((booking, out))
    }

    /// Add a selected photo. Adding a name that is already selected is a no-op.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn add_selection(&self, booking_id: Uuid, name: &str) -> Result<Booking, AppError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::Invalid(anyhow::anyhow!(
                "Photo name must not be empty"
            )));
        }
        let (booking, _) = self
            .edit_selections(booking_id, |b| Ok((b.add_selection(&name), ())))
            .await?;
        Ok(booking)
    }

    /// Remove a selected photo. Unknown names are ignored.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn remove_selection(
        &self,
        booking_id: Uuid,
        name: &str,
    ) -> Result<Booking, AppError> {
        let (booking, _) = self
            .edit_selections(booking_id, |b| Ok((b.remove_selection(name), ())))
            .await?;
        Ok(booking)
    }

    /// Flip the edited flag of a selected photo.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn toggle_selection_edited(
        &self,
        booking_id: Uuid,
        name: &str,
    ) -> Result<Booking, AppError> {
        let (booking, _) = self
            .edit_selections(booking_id, |b| match b.toggle_edited(name) {
                Some(edited) => Ok((true, edited)),
                None => Err(AppError::NotFound(anyhow::anyhow!(
                    "Photo '{}' is not selected",
                    name
                ))),
            })
            .await?;
        Ok(booking)
    }
}
