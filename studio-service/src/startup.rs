//! Application startup and lifecycle management.

use crate::config::StudioConfig;
use crate::handlers::{self, bookings, catalog, clients, editing, invoices, settings};
use crate::services::{
    init_metrics, LogNotifier, PgStore, ReminderNotifier, ReminderScheduler, Studio,
    WebhookNotifier,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub studio: Studio,
}

/// Full HTTP surface: probes, metrics and the studio API.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/bootstrap", get(handlers::bootstrap))
        // Clients
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clients/:id",
            get(clients::get_client)
                .patch(clients::update_client)
                .delete(clients::delete_client),
        )
        // Catalog
        .route(
            "/session-categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/session-categories/:id",
            axum::routing::delete(catalog::delete_category),
        )
        .route(
            "/session-packages",
            get(catalog::list_packages).post(catalog::create_package),
        )
        .route(
            "/session-packages/:id",
            axum::routing::delete(catalog::delete_package),
        )
        .route(
            "/payment-accounts",
            get(catalog::list_payment_accounts).post(catalog::create_payment_account),
        )
        // Bookings
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route(
            "/bookings/:id",
            get(bookings::get_booking)
                .patch(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        .route("/bookings/:id/invoice", post(bookings::invoice_booking))
        .route("/bookings/:id/selections", post(bookings::add_selection))
        .route(
            "/bookings/:id/selections/:name",
            axum::routing::delete(bookings::remove_selection),
        )
        .route(
            "/bookings/:id/selections/:name/toggle-edited",
            post(bookings::toggle_selection_edited),
        )
        .route(
            "/bookings/:id/finalize-selections",
            post(bookings::finalize_selections),
        )
        // Invoices
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/invoices/:id",
            get(invoices::get_invoice)
                .patch(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route(
            "/invoices/:id/items",
            axum::routing::put(invoices::replace_items),
        )
        .route("/invoices/:id/payments", post(invoices::record_payment))
        .route("/invoices/:id/reminders", post(invoices::send_reminder))
        .route("/reminders/run", post(invoices::run_reminders))
        .route("/reports/aging", get(invoices::aging_report))
        // Editing
        .route(
            "/editing-jobs",
            get(editing::list_jobs).post(editing::create_job),
        )
        .route(
            "/editing-jobs/:id",
            get(editing::get_job)
                .patch(editing::update_job)
                .delete(editing::delete_job),
        )
        .route("/editing-jobs/:id/status", post(editing::move_job))
        .route("/editing-jobs/:id/revisions", post(editing::request_revision))
        .route(
            "/editing-statuses",
            get(editing::list_statuses).post(editing::create_status),
        )
        .route(
            "/editing-statuses/:id",
            axum::routing::patch(editing::update_status).delete(editing::delete_status),
        )
        // Settings
        .route(
            "/settings",
            get(settings::get_settings).patch(settings::update_settings),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
    reminder_interval: std::time::Duration,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: StudioConfig) -> Result<Self, AppError> {
        init_metrics();

        let store = PgStore::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        store.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        let notifier: Arc<dyn ReminderNotifier> = match &config.reminders.webhook_url {
            Some(url) => {
                tracing::info!(webhook = %url, "Reminders delivered via webhook");
                Arc::new(WebhookNotifier::new(url.as_str()).map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!("Invalid reminder webhook: {}", e))
                })?)
            }
            None => {
                tracing::info!("Reminder webhook not configured - reminders will be logged only");
                Arc::new(LogNotifier)
            }
        };

        let studio = Studio::new(Arc::new(store), notifier, config.studio_policy());
        let state = AppState { studio };

        let addr = config.common.bind_address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(http_port = port, "Studio service listener bound");

        Ok(Self {
            port,
            listener,
            state,
            reminder_interval: config.reminders.interval(),
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Handle to the reminder scheduler, for shutting it down from outside.
    pub fn reminder_scheduler(&self) -> Arc<ReminderScheduler> {
        self.state.studio.reminders.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let scheduler = self.state.studio.reminders.clone();
        let scheduler_task = tokio::spawn(scheduler.clone().run(self.reminder_interval));

        let router = build_router(self.state);

        tracing::info!(
            service = "studio-service",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.port,
            "Service ready to accept connections"
        );

        let result = axum::serve(self.listener, router).await;

        scheduler.shutdown();
        if let Err(e) = scheduler_task.await {
            tracing::warn!(error = %e, "Reminder scheduler task ended abnormally");
        }

        result.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
