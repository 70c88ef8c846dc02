//! Prometheus metrics for studio-service.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter_vec, CounterVec,
    HistogramVec, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Recorder handle for the HTTP middleware counters.
static METRICS_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "studio_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Invoices created, by origin (booking, manual).
pub static INVOICES_CREATED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "studio_invoices_created_total",
        "Total number of invoices created",
        &["origin"]
    )
    .expect("Failed to register invoices_created_total")
});

/// Payments recorded, by resulting invoice status.
pub static PAYMENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "studio_payments_total",
        "Total number of payments recorded",
        &["invoice_status"]
    )
    .expect("Failed to register payments_total")
});

/// Payment amount received.
pub static PAYMENT_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "studio_payment_amount_total",
        "Total payment amount received",
        &["account"]
    )
    .expect("Failed to register payment_amount_total")
});

/// Booking status transitions.
pub static BOOKING_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "studio_booking_transitions_total",
        "Booking status transitions",
        &["from", "to"]
    )
    .expect("Failed to register booking_transitions_total")
});

/// Editing job moves, by target stage.
pub static EDITING_TRANSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "studio_editing_transitions_total",
        "Editing job status moves by target stage",
        &["stage"]
    )
    .expect("Failed to register editing_transitions_total")
});

/// Reminder dispatch outcomes (sent, failed, skipped).
pub static REMINDERS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "studio_reminders_total",
        "Payment reminder outcomes",
        &["outcome"]
    )
    .expect("Failed to register reminders_total")
});

/// Initialize all metrics (forces lazy initialization) and install the
/// recorder used by the HTTP middleware. Safe to call more than once.
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&INVOICES_CREATED_TOTAL);
    Lazy::force(&PAYMENTS_TOTAL);
    Lazy::force(&PAYMENT_AMOUNT_TOTAL);
    Lazy::force(&BOOKING_TRANSITIONS_TOTAL);
    Lazy::force(&EDITING_TRANSITIONS_TOTAL);
    Lazy::force(&REMINDERS_TOTAL);

    METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    });
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .and_then(|handle| handle.as_ref().map(|h| h.render()))
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    output.push_str(
        &encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default(),
    );
    output
}
