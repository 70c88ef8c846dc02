//! Invoice model for studio-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::Payment;

/// Invoice status. Always derived from amount, payments and due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Sent,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            _ => InvoiceStatus::Sent,
        }
    }
}

/// Line on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Bill for one booking of one client.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub booking_id: Uuid,
    pub client_id: Uuid,
    pub items: Json<Vec<InvoiceItem>>,
    pub amount: Decimal,
    pub amount_overridden: bool,
    pub amount_paid: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Invoice {
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_string(&self.status)
    }

    pub fn outstanding(&self) -> Decimal {
        (self.amount - self.amount_paid).max(Decimal::ZERO)
    }
}

/// Invoice together with its payments in insertion order.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDetails {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub payments: Vec<Payment>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub client_id: Option<Uuid>,
    pub booking_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    /// Only invoices not yet marked paid whose due date is strictly before this date.
    pub unpaid_due_before: Option<NaiveDate>,
}

/// Input for creating an invoice by hand.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub booking_id: Uuid,
    pub items: Vec<InvoiceItem>,
    pub amount_override: Option<Decimal>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

/// Patch for invoice header fields.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub due_date: Option<NaiveDate>,
    pub amount_override: Option<Decimal>,
    /// Drop any override and go back to the item-derived amount.
    pub clear_override: bool,
}
