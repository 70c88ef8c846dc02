//! Booking model for studio-service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Strict parse; `None` for anything that is not a stored status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn from_string(s: &str) -> Self {
        Self::parse(s).unwrap_or(BookingStatus::Pending)
    }

    /// Whether a booking may move from `self` to `next`.
    ///
    /// Pending and Confirmed flip freely, any live booking may complete, and
    /// anything may be cancelled. Nothing returns to Pending/Confirmed once
    /// Completed or Cancelled, and a Cancelled booking never completes.
    /// Re-saving the current status is always allowed.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Pending | Confirmed, Pending | Confirmed) => true,
            (Pending | Confirmed, Completed) => true,
            (_, Cancelled) => true,
            _ => false,
        }
    }
}

/// A named photo picked by the client, with its editing flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSelection {
    pub name: String,
    pub edited: bool,
}

/// Scheduled photography session.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub booking_id: Uuid,
    pub client_id: Uuid,
    pub session_category_id: Uuid,
    pub session_package_id: Uuid,
    pub photographer_id: Option<Uuid>,
    pub session_date: DateTime<Utc>,
    pub status: String,
    pub invoice_id: Option<Uuid>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub photo_selections: Json<Vec<PhotoSelection>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Booking {
    pub fn status(&self) -> BookingStatus {
        BookingStatus::from_string(&self.status)
    }

    pub fn has_invoice(&self) -> bool {
        self.invoice_id.is_some()
    }

    /// Add a selection by name. Names are unique; re-adding is a no-op.
    /// Returns whether the list changed.
    pub fn add_selection(&mut self, name: &str) -> bool {
        if self.photo_selections.iter().any(|s| s.name == name) {
            return false;
        }
        self.photo_selections.push(PhotoSelection {
            name: name.to_string(),
            edited: false,
        });
        true
    }

    /// Remove a selection by name. Removing an unknown name is a no-op.
    pub fn remove_selection(&mut self, name: &str) -> bool {
        let before = self.photo_selections.len();
        self.photo_selections.retain(|s| s.name != name);
        self.photo_selections.len() != before
    }

    /// Flip the edited flag. Returns the new flag, or `None` for an unknown name.
    pub fn toggle_edited(&mut self, name: &str) -> Option<bool> {
        self.photo_selections
            .iter_mut()
            .find(|s| s.name == name)
            .map(|s| {
                s.edited = !s.edited;
                s.edited
            })
    }
}

/// Filter parameters for listing bookings.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub client_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Input for creating a booking.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub client_id: Uuid,
    pub session_category_id: Uuid,
    pub session_package_id: Uuid,
    pub photographer_id: Option<Uuid>,
    pub session_date: DateTime<Utc>,
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
    pub location: Option<String>,
}

/// Patch for an existing booking. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateBooking {
    pub session_category_id: Option<Uuid>,
    pub session_package_id: Option<Uuid>,
    pub photographer_id: Option<Uuid>,
    pub session_date: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
    pub location: Option<String>,
}
