//! Payment model for studio-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable payment applied to one invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub payment_date: NaiveDate,
    pub amount: Decimal,
    pub account_id: Uuid,
    pub method_notes: Option<String>,
    pub recorded_by: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub account_id: Uuid,
    pub method_notes: Option<String>,
    pub recorded_by: Option<String>,
}

/// Account a payment lands in (bank, cash box, wallet).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentAccount {
    pub account_id: Uuid,
    pub name: String,
    pub details: Option<String>,
    pub created_utc: DateTime<Utc>,
}
