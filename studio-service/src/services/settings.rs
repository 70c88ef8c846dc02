//! Studio settings.

use chrono::Utc;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::models::{StudioSettings, UpdateSettings};
use crate::services::store::Store;

#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn Store>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get_settings(&self) -> Result<StudioSettings, AppError> {
        let mut uow = self.store.begin().await?;
        uow.get_settings().await
    }

    #[instrument(skip(self, patch))]
    pub async fn update_settings(&self, patch: UpdateSettings) -> Result<StudioSettings, AppError> {
        let mut uow = self.store.begin().await?;
        let mut settings = uow.get_settings().await?;
        if let Some(name) = patch.studio_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::Invalid(anyhow::anyhow!(
                    "Studio name must not be empty"
                )));
            }
            settings.studio_name = name.to_string();
        }
        if let Some(enabled) = patch.automated_reminders_enabled {
            settings.automated_reminders_enabled = enabled;
        }
        settings.updated_utc = Utc::now();
        uow.save_settings(&settings).await?;
        uow.commit().await?;

        info!(
            automated_reminders_enabled = settings.automated_reminders_enabled,
            "Settings updated"
        );
        Ok(settings)
    }
}
