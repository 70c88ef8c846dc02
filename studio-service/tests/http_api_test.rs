//! End-to-end tests through the axum router.

mod common;

use axum::http::StatusCode;
use common::{call, dec, spawn_studio};
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn money(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

fn id(value: &Value, field: &str) -> String {
    value[field].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_readiness_report_ok() {
    let t = spawn_studio();
    let router = t.router();

    let (status, body) = call(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "studio-service");

    let (status, _) = call(&router, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&router, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn request_shape_errors_map_to_400_and_422() {
    let t = spawn_studio();
    let router = t.router();

    let (status, body) = call(
        &router,
        "POST",
        "/api/v1/clients",
        Some(json!({ "name": "Meera", "email": "not-an-email" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "validation_failed");

    let (status, body) = call(
        &router,
        "POST",
        "/api/v1/clients",
        Some(json!({ "phone": "12345" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid");

    let (status, body) = call(
        &router,
        "GET",
        "/api/v1/invoices/5d0c8a44-8f5e-4a57-9d43-3c1f0c7e2b11",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn booking_to_paid_invoice_flow() {
    let t = spawn_studio();
    let router = t.router();

    let (status, client) = call(
        &router,
        "POST",
        "/api/v1/clients",
        Some(json!({ "name": "Meera Iyer", "phone": "+91 90000 11111" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(client["financial_status"], "good_standing");
    let client_id = id(&client, "client_id");

    let (_, category) = call(
        &router,
        "POST",
        "/api/v1/session-categories",
        Some(json!({ "name": "Engagement" })),
    )
    .await;
    let category_id = id(&category, "category_id");
    let (status, package) = call(
        &router,
        "POST",
        "/api/v1/session-packages",
        Some(json!({ "category_id": category_id, "name": "Evening", "price": "1200.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let package_id = id(&package, "package_id");
    let (_, account) = call(
        &router,
        "POST",
        "/api/v1/payment-accounts",
        Some(json!({ "name": "Cash" })),
    )
    .await;
    let account_id = id(&account, "account_id");

    let (status, booking) = call(
        &router,
        "POST",
        "/api/v1/bookings",
        Some(json!({
            "client_id": client_id,
            "session_category_id": category_id,
            "session_package_id": package_id,
            "session_date": "2026-12-05T17:30:00Z",
            "status": "completed"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "completed");
    let booking_id = id(&booking, "booking_id");

    let (status, body) = call(
        &router,
        "PATCH",
        &format!("/api/v1/bookings/{booking_id}"),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "invalid_state");

    let (status, invoice) = call(
        &router,
        "POST",
        &format!("/api/v1/bookings/{booking_id}/invoice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(money(&invoice["amount"]), dec("1200"));
    assert_eq!(invoice["status"], "sent");
    let invoice_id = id(&invoice, "invoice_id");

    let (status, body) = call(
        &router,
        "POST",
        &format!("/api/v1/bookings/{booking_id}/invoice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let (status, _) = call(
        &router,
        "POST",
        &format!("/api/v1/invoices/{invoice_id}/payments"),
        Some(json!({ "amount": 0, "account_id": account_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, paid) = call(
        &router,
        "POST",
        &format!("/api/v1/invoices/{invoice_id}/payments"),
        Some(json!({ "amount": "1200", "account_id": account_id, "recorded_by": "desk" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(paid["status"], "paid");
    assert_eq!(paid["payments"].as_array().unwrap().len(), 1);

    let (_, client) = call(&router, "GET", &format!("/api/v1/clients/{client_id}"), None).await;
    assert_eq!(client["total_bookings"], 1);
    assert_eq!(money(&client["total_spent"]), dec("1200"));

    let (status, _) = call(
        &router,
        "DELETE",
        &format!("/api/v1/clients/{client_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, jobs) = call(&router, "GET", "/api/v1/editing-jobs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs.as_array().unwrap().len(), 1);

    let (status, _) = call(
        &router,
        "DELETE",
        &format!("/api/v1/bookings/{booking_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(
        &router,
        "DELETE",
        &format!("/api/v1/clients/{client_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn bootstrap_returns_the_whole_snapshot() {
    let t = spawn_studio();
    let fx = t.seed().await;
    t.book(&fx, studio_service::models::BookingStatus::Pending)
        .await;
    let router = t.router();

    let (status, body) = call(&router, "GET", "/api/v1/bootstrap", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["automated_reminders_enabled"], false);
    assert_eq!(body["clients"].as_array().unwrap().len(), 1);
    assert_eq!(body["bookings"].as_array().unwrap().len(), 1);
    assert_eq!(body["editing_statuses"].as_array().unwrap().len(), 5);
    assert_eq!(body["aging"]["invoice_count"], 0);
}

#[tokio::test]
async fn settings_toggle_drives_the_reminder_run() {
    let t = spawn_studio();
    let router = t.router();

    let (status, summary) = call(&router, "POST", "/api/v1/reminders/run", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["enabled"], false);

    let (status, settings) = call(
        &router,
        "PATCH",
        "/api/v1/settings",
        Some(json!({ "automated_reminders_enabled": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["automated_reminders_enabled"], true);

    let (_, summary) = call(&router, "POST", "/api/v1/reminders/run", None).await;
    assert_eq!(summary["enabled"], true);
    assert_eq!(summary["scanned"], 0);
}

#[tokio::test]
async fn editing_status_admin_over_http() {
    let t = spawn_studio();
    let router = t.router();

    let (status, body) = call(
        &router,
        "POST",
        "/api/v1/editing-statuses",
        Some(json!({ "name": "Proofing", "color": "#123456", "stage": "client_review" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    let (status, created) = call(
        &router,
        "POST",
        "/api/v1/editing-statuses",
        Some(json!({ "name": "Proofing", "color": "#123456", "stage": "custom" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["sort_order"], 60);

    let status_id = id(&created, "status_id");
    let (status, _) = call(
        &router,
        "DELETE",
        &format!("/api/v1/editing-statuses/{status_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn request_id_is_echoed_or_minted() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let t = spawn_studio();
    let router = t.router();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "desk-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "desk-42");

    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "  ")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let minted = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(minted).is_ok());
}
