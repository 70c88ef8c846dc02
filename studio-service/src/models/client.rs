//! Client model for studio-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Client profile with cached aggregate figures.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub join_date: NaiveDate,
    pub total_bookings: i64,
    pub total_spent: Decimal,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Derived standing of a client. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialStatus {
    GoodStanding,
    Overdue,
    HighValue,
}

impl FinancialStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FinancialStatus::GoodStanding => "Good Standing",
            FinancialStatus::Overdue => "Overdue",
            FinancialStatus::HighValue => "High Value",
        }
    }
}

/// Result of aggregating a client's bookings and invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientStats {
    pub total_bookings: i64,
    pub total_spent: Decimal,
}

/// Client as presented to readers, with the derived financial status.
#[derive(Debug, Clone, Serialize)]
pub struct ClientView {
    #[serde(flatten)]
    pub client: Client,
    pub financial_status: FinancialStatus,
}

/// Input for creating a client.
#[derive(Debug, Clone)]
pub struct CreateClient {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Profile patch. Aggregate fields are not patchable.
#[derive(Debug, Clone, Default)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
}
