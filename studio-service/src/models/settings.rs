//! Studio-wide settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Singleton settings row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudioSettings {
    pub studio_name: String,
    pub automated_reminders_enabled: bool,
    pub updated_utc: DateTime<Utc>,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            studio_name: "Studio".to_string(),
            automated_reminders_enabled: false,
            updated_utc: Utc::now(),
        }
    }
}

/// Settings patch.
#[derive(Debug, Clone, Default)]
pub struct UpdateSettings {
    pub studio_name: Option<String>,
    pub automated_reminders_enabled: Option<bool>,
}
