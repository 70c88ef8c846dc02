//! Services for studio-service.

pub mod bookings;
pub mod catalog;
pub mod client_stats;
pub mod clients;
pub mod dashboard;
pub mod database;
pub mod editing;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod money;
pub mod notifier;
pub mod reminders;
pub mod settings;
pub mod store;

use rust_decimal::Decimal;
use std::sync::Arc;

pub use bookings::BookingController;
pub use catalog::CatalogService;
pub use clients::ClientService;
pub use dashboard::{DashboardService, StudioSnapshot};
pub use database::PgStore;
pub use editing::EditingWorkflow;
pub use ledger::InvoiceLedger;
pub use memory::MemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use notifier::{LogNotifier, MockReminderNotifier, ReminderNotifier, WebhookNotifier};
pub use reminders::{ReminderRunSummary, ReminderScheduler};
pub use settings::SettingsService;
pub use store::{Store, UnitOfWork};

/// Business knobs shared by the engine components.
#[derive(Debug, Clone)]
pub struct StudioPolicy {
    /// Lifetime spend above which a client is High Value.
    pub high_value_threshold: Decimal,
    /// Days from issue to due date for generated invoices.
    pub payment_terms_days: i64,
    /// Minimum gap between two automated reminders for one invoice.
    pub reminder_resend_after: chrono::Duration,
}

impl Default for StudioPolicy {
    fn default() -> Self {
        Self {
            high_value_threshold: Decimal::from(5000),
            payment_terms_days: 14,
            reminder_resend_after: chrono::Duration::hours(24),
        }
    }
}

/// The engine: one handle per component over a shared store.
#[derive(Clone)]
pub struct Studio {
    pub store: Arc<dyn Store>,
    pub clients: ClientService,
    pub catalog: CatalogService,
    pub bookings: BookingController,
    pub ledger: InvoiceLedger,
    pub editing: EditingWorkflow,
    pub settings: SettingsService,
    pub dashboard: DashboardService,
    pub reminders: Arc<ReminderScheduler>,
}

impl Studio {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn ReminderNotifier>,
        policy: StudioPolicy,
    ) -> Self {
        Self {
            clients: ClientService::new(store.clone(), policy.clone()),
            catalog: CatalogService::new(store.clone()),
            bookings: BookingController::new(store.clone()),
            ledger: InvoiceLedger::new(store.clone(), policy.clone()),
            editing: EditingWorkflow::new(store.clone()),
            settings: SettingsService::new(store.clone()),
            dashboard: DashboardService::new(store.clone(), policy.clone()),
            reminders: Arc::new(ReminderScheduler::new(store.clone(), notifier, policy)),
            store,
        }
    }
}
