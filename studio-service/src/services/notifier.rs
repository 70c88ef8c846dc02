//! Payment reminder delivery.
//!
//! Dispatch is a side effect only: the scheduler records `last_reminder_sent`
//! after a successful send, but nothing in the ledger waits on delivery.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const WHATSAPP_BASE_URL: &str = "https://wa.me";

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Send error: {0}")]
    SendFailed(String),
}

/// Everything a channel needs to tell a client their invoice is overdue.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReminder {
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub studio_name: String,
    pub outstanding: Decimal,
    pub due_date: NaiveDate,
}

impl PaymentReminder {
    pub fn message(&self) -> String {
        format!(
            "Hi {}, this is a friendly reminder from {} that {} is still outstanding on your \
             invoice due {}. Thank you!",
            self.client_name,
            self.studio_name,
            self.outstanding.round_dp(2),
            self.due_date.format("%d %b %Y")
        )
    }

    /// Click-to-chat link with the message prefilled, or `None` without a usable phone.
    pub fn whatsapp_link(&self) -> Option<String> {
        let digits: String = self
            .phone
            .as_deref()?
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}?text={}",
            WHATSAPP_BASE_URL,
            digits,
            urlencoding::encode(&self.message())
        ))
    }
}

/// Channel that delivers payment reminders.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn send(&self, reminder: &PaymentReminder) -> Result<(), NotifierError>;

    fn name(&self) -> &'static str;
}

/// Composes the WhatsApp link and logs it for staff to follow up.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl ReminderNotifier for LogNotifier {
    async fn send(&self, reminder: &PaymentReminder) -> Result<(), NotifierError> {
        let link = reminder.whatsapp_link();
        if link.is_none() && reminder.email.is_none() {
            return Err(NotifierError::InvalidRecipient(format!(
                "Client {} has no phone or email",
                reminder.client_id
            )));
        }

        tracing::info!(
            invoice_id = %reminder.invoice_id,
            client_id = %reminder.client_id,
            outstanding = %reminder.outstanding,
            whatsapp_link = link.as_deref().unwrap_or("-"),
            email = reminder.email.as_deref().unwrap_or("-"),
            "Payment reminder ready"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: &'static str,
    #[serde(flatten)]
    reminder: &'a PaymentReminder,
    message: String,
    whatsapp_link: Option<String>,
}

/// Posts reminders as JSON to an external dispatcher.
pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifierError::Connection(format!("Failed to build client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl ReminderNotifier for WebhookNotifier {
    async fn send(&self, reminder: &PaymentReminder) -> Result<(), NotifierError> {
        let payload = WebhookPayload {
            event: "invoice.payment_reminder",
            reminder,
            message: reminder.message(),
            whatsapp_link: reminder.whatsapp_link(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifierError::Connection(format!("Failed to reach webhook: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::SendFailed(format!(
                "Webhook returned error status {}: {}",
                status, body
            )));
        }

        tracing::info!(invoice_id = %reminder.invoice_id, "Payment reminder posted to webhook");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Mock notifier for testing
#[derive(Default)]
pub struct MockReminderNotifier {
    fail: AtomicBool,
    send_count: AtomicU64,
    sent: Mutex<Vec<Uuid>>,
}

impl MockReminderNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    /// Invoice ids reminded so far, in send order.
    pub fn sent_invoices(&self) -> Vec<Uuid> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ReminderNotifier for MockReminderNotifier {
    async fn send(&self, reminder: &PaymentReminder) -> Result<(), NotifierError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifierError::SendFailed(
                "Mock notifier set to fail".to_string(),
            ));
        }

        self.send_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(reminder.invoice_id);
        }

        tracing::info!(
            invoice_id = %reminder.invoice_id,
            "[MOCK] Payment reminder would be sent"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
