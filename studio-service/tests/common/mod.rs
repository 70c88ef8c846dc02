//! Common test utilities for studio-service integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::{Arc, Once};
use studio_service::models::{
    Booking, BookingStatus, CreateBooking, CreateClient, CreateInvoice, CreateSessionPackage,
    Invoice, InvoiceItem, UpdateSettings,
};
use studio_service::services::{MemoryStore, MockReminderNotifier, Studio, StudioPolicy};
use studio_service::startup::{build_router, AppState};
use tower::ServiceExt;
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,studio_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn item(description: &str, quantity: i32, unit_price: &str) -> InvoiceItem {
    InvoiceItem {
        description: description.to_string(),
        quantity,
        unit_price: dec(unit_price),
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn days_ago(days: i64) -> NaiveDate {
    today() - Duration::days(days)
}

/// Engine over an in-memory store with the default workflow and a mock notifier.
pub struct TestStudio {
    pub studio: Studio,
    pub notifier: Arc<MockReminderNotifier>,
}

/// Catalog rows and a client most tests need.
pub struct Fixture {
    pub client_id: Uuid,
    pub category_id: Uuid,
    pub package_id: Uuid,
    pub account_id: Uuid,
}

pub fn spawn_studio() -> TestStudio {
    spawn_studio_with(MemoryStore::with_default_workflow())
}

pub fn spawn_studio_with(store: MemoryStore) -> TestStudio {
    init_tracing();
    let notifier = Arc::new(MockReminderNotifier::new());
    let studio = Studio::new(Arc::new(store), notifier.clone(), StudioPolicy::default());
    TestStudio { studio, notifier }
}

impl TestStudio {
    /// One client, a "Wedding" category with a 1500 "Full Day" package and a bank account.
    pub async fn seed(&self) -> Fixture {
        let client = self
            .studio
            .clients
            .create_client(CreateClient {
                name: "Asha Rao".to_string(),
                phone: Some("+91 98765 43210".to_string()),
                email: Some("asha@example.com".to_string()),
                join_date: None,
                notes: None,
            })
            .await
            .unwrap();
        let category = self
            .studio
            .catalog
            .create_category("Wedding", None)
            .await
            .unwrap();
        let package = self
            .studio
            .catalog
            .create_package(CreateSessionPackage {
                category_id: category.category_id,
                name: "Full Day".to_string(),
                price: dec("1500"),
            })
            .await
            .unwrap();
        let account = self
            .studio
            .catalog
            .create_payment_account("Bank", Some("HDFC current".to_string()))
            .await
            .unwrap();

        Fixture {
            client_id: client.client.client_id,
            category_id: category.category_id,
            package_id: package.package_id,
            account_id: account.account_id,
        }
    }

    pub async fn book(&self, fx: &Fixture, status: BookingStatus) -> Booking {
        self.studio
            .bookings
            .create_booking(CreateBooking {
                client_id: fx.client_id,
                session_category_id: fx.category_id,
                session_package_id: fx.package_id,
                photographer_id: None,
                session_date: Utc::now() + Duration::days(7),
                status: Some(status),
                notes: None,
                location: Some("Studio A".to_string()),
            })
            .await
            .unwrap()
    }

    /// Manual invoice for a fresh booking, with explicit dates.
    pub async fn invoice(
        &self,
        fx: &Fixture,
        items: Vec<InvoiceItem>,
        issue_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Invoice {
        let booking = self.book(fx, BookingStatus::Confirmed).await;
        self.studio
            .ledger
            .create_invoice(CreateInvoice {
                booking_id: booking.booking_id,
                items,
                amount_override: None,
                issue_date: Some(issue_date),
                due_date: Some(due_date),
            })
            .await
            .unwrap()
    }

    pub async fn enable_reminders(&self) {
        self.studio
            .settings
            .update_settings(UpdateSettings {
                studio_name: Some("Lumen Studio".to_string()),
                automated_reminders_enabled: Some(true),
            })
            .await
            .unwrap();
    }

    pub fn router(&self) -> Router {
        build_router(AppState {
            studio: self.studio.clone(),
        })
    }
}

/// Send one request through the router and decode the JSON body (Null when empty).
pub async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}
