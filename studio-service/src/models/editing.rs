//! Editing workflow models for studio-service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Semantic role of a configured editing status.
///
/// Display names are user-editable; business rules only ever look at the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    AwaitingSelection,
    ReadyForEdit,
    InProgress,
    ClientReview,
    Completed,
    Custom,
}

impl WorkflowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::AwaitingSelection => "awaiting_selection",
            WorkflowStage::ReadyForEdit => "ready_for_edit",
            WorkflowStage::InProgress => "in_progress",
            WorkflowStage::ClientReview => "client_review",
            WorkflowStage::Completed => "completed",
            WorkflowStage::Custom => "custom",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "awaiting_selection" => WorkflowStage::AwaitingSelection,
            "ready_for_edit" => WorkflowStage::ReadyForEdit,
            "in_progress" => WorkflowStage::InProgress,
            "client_review" => WorkflowStage::ClientReview,
            "completed" => WorkflowStage::Completed,
            _ => WorkflowStage::Custom,
        }
    }

    /// Custom stages may repeat; every other stage is held by at most one status.
    pub fn is_unique(&self) -> bool {
        !matches!(self, WorkflowStage::Custom)
    }
}

/// Configured editing status row (Kanban column).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EditingStatus {
    pub status_id: Uuid,
    pub name: String,
    pub color: String,
    pub sort_order: i32,
    pub stage: String,
    pub created_utc: DateTime<Utc>,
}

impl EditingStatus {
    pub fn stage(&self) -> WorkflowStage {
        WorkflowStage::from_string(&self.stage)
    }
}

/// Editing job priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Normal,
        }
    }
}

/// Revision requested by the client during review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionNote {
    pub note: String,
    pub date: DateTime<Utc>,
}

/// Post-production work unit for a completed booking.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EditingJob {
    pub job_id: Uuid,
    pub booking_id: Uuid,
    pub client_id: Uuid,
    pub editor_id: Option<Uuid>,
    pub status_id: Uuid,
    pub upload_date: Option<NaiveDate>,
    pub drive_folder_url: Option<String>,
    pub photographer_notes: Option<String>,
    pub priority: String,
    pub revision_count: i32,
    pub revision_notes: Json<Vec<RevisionNote>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl EditingJob {
    pub fn priority(&self) -> Priority {
        Priority::from_string(&self.priority)
    }

    /// Append a revision; the count always tracks the note list.
    pub fn push_revision(&mut self, note: String, at: DateTime<Utc>) {
        self.revision_notes.push(RevisionNote { note, date: at });
        self.revision_count = self.revision_notes.len() as i32;
    }
}

/// Filter parameters for listing editing jobs.
#[derive(Debug, Clone, Default)]
pub struct EditingJobFilter {
    pub status_id: Option<Uuid>,
    pub editor_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
}

/// Optional details supplied when a job is created by hand.
#[derive(Debug, Clone, Default)]
pub struct CreateEditingJob {
    pub editor_id: Option<Uuid>,
    pub priority: Option<Priority>,
    pub drive_folder_url: Option<String>,
    pub photographer_notes: Option<String>,
}

/// Patch for job details. Status moves go through the dedicated transition.
#[derive(Debug, Clone, Default)]
pub struct UpdateEditingJob {
    pub editor_id: Option<Uuid>,
    pub priority: Option<Priority>,
    pub upload_date: Option<NaiveDate>,
    pub drive_folder_url: Option<String>,
    pub photographer_notes: Option<String>,
}

/// Input for creating an editing status.
#[derive(Debug, Clone)]
pub struct CreateEditingStatus {
    pub name: String,
    pub color: String,
    pub stage: WorkflowStage,
    pub sort_order: Option<i32>,
}

/// Patch for an editing status.
#[derive(Debug, Clone, Default)]
pub struct UpdateEditingStatus {
    pub name: Option<String>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_strings_round_trip() {
        for stage in [
            WorkflowStage::AwaitingSelection,
            WorkflowStage::ReadyForEdit,
            WorkflowStage::InProgress,
            WorkflowStage::ClientReview,
            WorkflowStage::Completed,
            WorkflowStage::Custom,
        ] {
            assert_eq!(WorkflowStage::from_string(stage.as_str()), stage);
        }
    }

    #[test]
    fn unknown_stage_is_custom() {
        assert_eq!(
            WorkflowStage::from_string("Awaiting Selection"),
            WorkflowStage::Custom
        );
        assert!(!WorkflowStage::Custom.is_unique());
        assert!(WorkflowStage::ClientReview.is_unique());
    }

    #[test]
    fn revision_count_tracks_notes() {
        let now = Utc::now();
        let mut job = EditingJob {
            job_id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            editor_id: None,
            status_id: Uuid::new_v4(),
            upload_date: None,
            drive_folder_url: None,
            photographer_notes: None,
            priority: Priority::Normal.as_str().to_string(),
            revision_count: 0,
            revision_notes: Json(Vec::new()),
            created_utc: now,
            updated_utc: now,
        };
        job.push_revision("warmer skin tones".to_string(), now);
        job.push_revision("crop tighter".to_string(), now);
        assert_eq!(job.revision_count, 2);
        assert_eq!(job.revision_notes[1].note, "crop tighter");
    }
}
