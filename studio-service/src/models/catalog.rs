//! Session catalog models for studio-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of session offered (wedding, portrait, product...).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionCategory {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Priced package within a category.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionPackage {
    pub package_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a package.
#[derive(Debug, Clone)]
pub struct CreateSessionPackage {
    pub category_id: Uuid,
    pub name: String,
    pub price: Decimal,
}
