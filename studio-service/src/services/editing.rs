//! Editing workflow.
//!
//! Jobs move between user-configured statuses. Business rules only look at a
//! status's `stage`; names and colours are display data.

use chrono::Utc;
use service_core::error::AppError;
use sqlx::types::Json;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, CreateEditingJob, CreateEditingStatus, EditingJob, EditingJobFilter,
    EditingStatus, Priority, UpdateEditingJob, UpdateEditingStatus, WorkflowStage,
};
use crate::services::metrics::EDITING_TRANSITIONS_TOTAL;
use crate::services::store::{Store, UnitOfWork};

fn job_not_found(job_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Editing job {} not found", job_id))
}

fn status_not_found(status_id: Uuid) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Editing status {} not found", status_id))
}

fn new_job(booking: &Booking, status_id: Uuid) -> EditingJob {
    let now = Utc::now();
    EditingJob {
        job_id: Uuid::new_v4(),
        booking_id: booking.booking_id,
        client_id: booking.client_id,
        editor_id: None,
        status_id,
        upload_date: None,
        drive_folder_url: None,
        photographer_notes: None,
        priority: Priority::Normal.as_str().to_string(),
        revision_count: 0,
        revision_notes: Json(Vec::new()),
        created_utc: now,
        updated_utc: now,
    }
}

async fn entry_status(uow: &mut dyn UnitOfWork) -> Result<EditingStatus, AppError> {
    uow.list_editing_statuses()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            AppError::InvalidState(anyhow::anyhow!("No editing statuses are configured"))
        })
}

/// Create the editing job for a booking unless one already exists.
///
/// New jobs start in the lowest-ordered status with no editor and no revisions.
#[instrument(skip(uow, booking), fields(booking_id = %booking.booking_id))]
pub(crate) async fn ensure_job_in(
    uow: &mut dyn UnitOfWork,
    booking: &Booking,
) -> Result<EditingJob, AppError> {
    if let Some(existing) = uow.get_editing_job_for_booking(booking.booking_id).await? {
        debug!(job_id = %existing.job_id, "Editing job already exists");
        return Ok(existing);
    }
    uow.lock_client(booking.client_id).await?;
    let status = entry_status(uow).await?;
    let job = new_job(booking, status.status_id);
    uow.save_editing_job(&job).await?;
    info!(job_id = %job.job_id, status = %status.name, "Editing job created");
    Ok(job)
}

/// Editing workflow service.
#[derive(Clone)]
pub struct EditingWorkflow {
    store: Arc<dyn Store>,
}

impl EditingWorkflow {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // -------------------------------------------------------------------------
    // Status administration
    // -------------------------------------------------------------------------

    pub async fn list_statuses(&self) -> Result<Vec<EditingStatus>, AppError> {
        let mut uow = self.store.begin().await?;
        uow.list_editing_statuses().await
    }

    #[instrument(skip(self, input), fields(name = %input.name, stage = input.stage.as_str()))]
    pub async fn create_status(
        &self,
        input: CreateEditingStatus,
    ) -> Result<EditingStatus, AppError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::Invalid(anyhow::anyhow!(
                "Editing status name must not be empty"
            )));
        }

        let mut uow = self.store.begin().await?;
        let statuses = uow.list_editing_statuses().await?;
        if input.stage.is_unique() && statuses.iter().any(|s| s.stage() == input.stage) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "A status for stage '{}' already exists",
                input.stage.as_str()
            )));
        }
        let sort_order = input.sort_order.unwrap_or_else(|| {
            statuses
                .iter()
                .map(|s| s.sort_order)
                .max()
                .map_or(10, |max| max + 10)
        });

        let status = EditingStatus {
            status_id: Uuid::new_v4(),
            name: name.to_string(),
            color: input.color,
            sort_order,
            stage: input.stage.as_str().to_string(),
            created_utc: Utc::now(),
        };
        uow.save_editing_status(&status).await?;
        uow.commit().await?;

        info!(status_id = %status.status_id, sort_order = sort_order, "Editing status created");
        Ok(status)
    }

    /// Rename, recolour or reorder a status. The stage is fixed.
    #[instrument(skip(self, patch), fields(status_id = %status_id))]
    pub async fn update_status_definition(
        &self,
        status_id: Uuid,
        patch: UpdateEditingStatus,
    ) -> Result<EditingStatus, AppError> {
        let mut uow = self.store.begin().await?;
        let mut status = uow
            .get_editing_status(status_id)
            .await?
            .ok_or_else(|| status_not_found(status_id))?;

        if let Some(name) = patch.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::Invalid(anyhow::anyhow!(
                    "Editing status name must not be empty"
                )));
            }
            status.name = name.to_string();
        }
        if let Some(color) = patch.color {
            status.color = color;
        }
        if let Some(sort_order) = patch.sort_order {
            status.sort_order = sort_order;
        }
        uow.save_editing_status(&status).await?;
        uow.commit().await?;
        Ok(status)
    }

    /// Delete a status no job sits in.
    #[instrument(skip(self), fields(status_id = %status_id))]
    pub async fn delete_status(&self, status_id: Uuid) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        if uow.get_editing_status(status_id).await?.is_none() {
            return Err(status_not_found(status_id));
        }
        if uow.editing_status_in_use(status_id).await? {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Editing status {} is in use by at least one job",
                status_id
            )));
        }
        uow.delete_editing_status(status_id).await?;
        uow.commit().await?;
        info!("Editing status deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Jobs
    // -------------------------------------------------------------------------

    /// Idempotently create the job for a completed booking.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn ensure_job_for_completed_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<EditingJob, AppError> {
        let mut uow = self.store.begin().await?;
        let booking = uow.lock_booking(booking_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Booking {} not found", booking_id))
        })?;
        if booking.status() != BookingStatus::Completed {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "Booking {} is {}, not completed",
                booking_id,
                booking.status
            )));
        }
        let job = ensure_job_in(uow.as_mut(), &booking).await?;
        uow.commit().await?;
        Ok(job)
    }

    /// Open a job by hand for a booking that has none.
    #[instrument(skip(self, input), fields(booking_id = %booking_id))]
    pub async fn create_job(
        &self,
        booking_id: Uuid,
        input: CreateEditingJob,
    ) -> Result<EditingJob, AppError> {
        let mut uow = self.store.begin().await?;
        let booking = uow.lock_booking(booking_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Booking {} not found", booking_id))
        })?;
        if booking.status() == BookingStatus::Cancelled {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "Booking {} is cancelled",
                booking_id
            )));
        }
        if uow.get_editing_job_for_booking(booking_id).await?.is_some() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Booking {} already has an editing job",
                booking_id
            )));
        }

        uow.lock_client(booking.client_id).await?;
        let status = entry_status(uow.as_mut()).await?;
        let mut job = new_job(&booking, status.status_id);
        job.editor_id = input.editor_id;
        job.priority = input.priority.unwrap_or(Priority::Normal).as_str().to_string();
        job.drive_folder_url = input.drive_folder_url;
        job.photographer_notes = input.photographer_notes;
        uow.save_editing_job(&job).await?;
        uow.commit().await?;

        info!(job_id = %job.job_id, "Editing job created");
        Ok(job)
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<EditingJob, AppError> {
        let mut uow = self.store.begin().await?;
        uow.get_editing_job(job_id)
            .await?
            .ok_or_else(|| job_not_found(job_id))
    }

    pub async fn list_jobs(&self, filter: &EditingJobFilter) -> Result<Vec<EditingJob>, AppError> {
        let mut uow = self.store.begin().await?;
        uow.list_editing_jobs(filter).await
    }

    /// Patch job details. Status is moved with [`EditingWorkflow::update_status`].
    #[instrument(skip(self, patch), fields(job_id = %job_id))]
    pub async fn update_job(
        &self,
        job_id: Uuid,
        patch: UpdateEditingJob,
    ) -> Result<EditingJob, AppError> {
        let mut uow = self.store.begin().await?;
        let mut job = uow
            .lock_editing_job(job_id)
            .await?
            .ok_or_else(|| job_not_found(job_id))?;

        if let Some(editor_id) = patch.editor_id {
            job.editor_id = Some(editor_id);
        }
        if let Some(priority) = patch.priority {
            job.priority = priority.as_str().to_string();
        }
        if let Some(upload_date) = patch.upload_date {
            job.upload_date = Some(upload_date);
        }
        if let Some(url) = patch.drive_folder_url {
            job.drive_folder_url = Some(url);
        }
        if let Some(notes) = patch.photographer_notes {
            job.photographer_notes = Some(notes);
        }
        job.updated_utc = Utc::now();
        uow.save_editing_job(&job).await?;
        uow.commit().await?;
        Ok(job)
    }

    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn delete_job(&self, job_id: Uuid) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        if !uow.delete_editing_job(job_id).await? {
            return Err(job_not_found(job_id));
        }
        uow.commit().await?;
        info!("Editing job deleted");
        Ok(())
    }

    /// Move a job to any configured status. No ordering is enforced.
    #[instrument(skip(self), fields(job_id = %job_id, status_id = %status_id))]
    pub async fn update_status(
        &self,
        job_id: Uuid,
        status_id: Uuid,
    ) -> Result<EditingJob, AppError> {
        let mut uow = self.store.begin().await?;
        let mut job = uow
            .lock_editing_job(job_id)
            .await?
            .ok_or_else(|| job_not_found(job_id))?;
        let status = uow
            .get_editing_status(status_id)
            .await?
            .ok_or_else(|| status_not_found(status_id))?;

        job.status_id = status.status_id;
        job.updated_utc = Utc::now();
        uow.save_editing_job(&job).await?;
        uow.commit().await?;

        EDITING_TRANSITIONS_TOTAL
            .with_label_values(&[status.stage().as_str()])
            .inc();
        info!(status = %status.name, "Editing job moved");
        Ok(job)
    }

    /// Close photo selection and hand the job to editing.
    ///
    /// Requires at least one selection and a job in the awaiting-selection
    /// stage. Moves to the ready-for-edit status, or the next status by order
    /// when no ready-for-edit status is configured.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn finalize_selections(&self, booking_id: Uuid) -> Result<EditingJob, AppError> {
        let mut uow = self.store.begin().await?;
        let booking = uow.lock_booking(booking_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Booking {} not found", booking_id))
        })?;
        let job_id = uow
            .get_editing_job_for_booking(booking_id)
            .await?
            .ok_or_else(|| {
                AppError::InvalidState(anyhow::anyhow!(
                    "Cannot finalize: booking {} has no editing job",
                    booking_id
                ))
            })?
            .job_id;
        let mut job = uow
            .lock_editing_job(job_id)
            .await?
            .ok_or_else(|| job_not_found(job_id))?;

        if booking.photo_selections.is_empty() {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "Cannot finalize: no photos selected"
            )));
        }

        let statuses = uow.list_editing_statuses().await?;
        let position = statuses.iter().position(|s| s.status_id == job.status_id);
        let current = position.map(|i| &statuses[i]);
        if current.map(|s| s.stage()) != Some(WorkflowStage::AwaitingSelection) {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "Cannot finalize: job is not awaiting selection"
            )));
        }

        let target = statuses
            .iter()
            .find(|s| s.stage() == WorkflowStage::ReadyForEdit)
            .or_else(|| position.and_then(|i| statuses.get(i + 1)))
            .ok_or_else(|| {
                AppError::InvalidState(anyhow::anyhow!(
                    "Cannot finalize: no status follows awaiting selection"
                ))
            })?;

        job.status_id = target.status_id;
        job.updated_utc = Utc::now();
        uow.save_editing_job(&job).await?;
        uow.commit().await?;

        EDITING_TRANSITIONS_TOTAL
            .with_label_values(&[target.stage().as_str()])
            .inc();
        info!(
            job_id = %job.job_id,
            selections = booking.photo_selections.len(),
            status = %target.name,
            "Selections finalized"
        );
        Ok(job)
    }

    /// Record a client revision request. Only allowed during client review;
    /// the status itself is left alone.
    #[instrument(skip(self, note), fields(job_id = %job_id))]
    pub async fn request_revision(&self, job_id: Uuid, note: &str) -> Result<EditingJob, AppError> {
        let note = note.trim();
        if note.is_empty() {
            return Err(AppError::Invalid(anyhow::anyhow!(
                "Revision note must not be empty"
            )));
        }

        let mut uow = self.store.begin().await?;
        let mut job = uow
            .lock_editing_job(job_id)
            .await?
            .ok_or_else(|| job_not_found(job_id))?;
        let stage = uow
            .get_editing_status(job.status_id)
            .await?
            .map(|s| s.stage());
        if stage != Some(WorkflowStage::ClientReview) {
            return Err(AppError::InvalidState(anyhow::anyhow!(
                "Revisions can only be requested during client review"
            )));
        }

        let now = Utc::now();
        job.push_revision(note.to_string(), now);
        job.updated_utc = now;
        uow.save_editing_job(&job).await?;
        uow.commit().await?;

        info!(revision_count = job.revision_count, "Revision requested");
        Ok(job)
    }
}
