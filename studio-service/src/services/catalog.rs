//! Session catalog and payment accounts.

use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{CreateSessionPackage, PaymentAccount, SessionCategory, SessionPackage};
use crate::services::store::Store;

fn require_name(kind: &str, name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Invalid(anyhow::anyhow!(
            "{} name must not be empty",
            kind
        )));
    }
    Ok(name.to_string())
}

/// Catalog service.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    #[instrument(skip(self, description))]
    pub async fn create_category(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<SessionCategory, AppError> {
        let category = SessionCategory {
            category_id: Uuid::new_v4(),
            name: require_name("Category", name)?,
            description,
            created_utc: Utc::now(),
        };
        let mut uow = self.store.begin().await?;
        uow.save_category(&category).await?;
        uow.commit().await?;
        info!(category_id = %category.category_id, "Session category created");
        Ok(category)
    }

    pub async fn list_categories(&self) -> Result<Vec<SessionCategory>, AppError> {
        let mut uow = self.store.begin().await?;
        uow.list_categories().await
    }

    /// Delete a category that no booking or package references.
    #[instrument(skip(self), fields(category_id = %category_id))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        if uow.get_category(category_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Session category {} not found",
                category_id
            )));
        }
        if uow.category_in_use(category_id).await? {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Session category {} is used by bookings or packages",
                category_id
            )));
        }
        uow.delete_category(category_id).await?;
        uow.commit().await?;
        info!("Session category deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Packages
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(category_id = %input.category_id))]
    pub async fn create_package(
        &self,
        input: CreateSessionPackage,
    ) -> Result<SessionPackage, AppError> {
        let name = require_name("Package", &input.name)?;
        if input.price < Decimal::ZERO {
            return Err(AppError::Invalid(anyhow::anyhow!(
                "Package price must not be negative"
            )));
        }

        let mut uow = self.store.begin().await?;
        if uow.get_category(input.category_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Session category {} not found",
                input.category_id
            )));
        }
        let package = SessionPackage {
            package_id: Uuid::new_v4(),
            category_id: input.category_id,
            name,
            price: input.price,
            created_utc: Utc::now(),
        };
        uow.save_package(&package).await?;
        uow.commit().await?;

        info!(package_id = %package.package_id, price = %package.price, "Session package created");
        Ok(package)
    }

    pub async fn list_packages(&self) -> Result<Vec<SessionPackage>, AppError> {
        let mut uow = self.store.begin().await?;
        uow.list_packages().await
    }

    /// Delete a package that no booking references.
    #[instrument(skip(self), fields(package_id = %package_id))]
    pub async fn delete_package(&self, package_id: Uuid) -> Result<(), AppError> {
        let mut uow = self.store.begin().await?;
        if uow.get_package(package_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Session package {} not found",
                package_id
            )));
        }
        if uow.package_in_use(package_id).await? {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Session package {} is used by bookings",
                package_id
            )));
        }
        uow.delete_package(package_id).await?;
        uow.commit().await?;
        info!("Session package deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payment accounts
    // -------------------------------------------------------------------------

    #[instrument(skip(self, details))]
    pub async fn create_payment_account(
        &self,
        name: &str,
        details: Option<String>,
    ) -> Result<PaymentAccount, AppError> {
        let account = PaymentAccount {
            account_id: Uuid::new_v4(),
            name: require_name("Account", name)?,
            details,
            created_utc: Utc::now(),
        };
        let mut uow = self.store.begin().await?;
        uow.save_payment_account(&account).await?;
        uow.commit().await?;
        info!(account_id = %account.account_id, "Payment account created");
        Ok(account)
    }

    pub async fn list_payment_accounts(&self) -> Result<Vec<PaymentAccount>, AppError> {
        let mut uow = self.store.begin().await?;
        uow.list_payment_accounts().await
    }
}
