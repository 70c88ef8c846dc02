//! Integration tests for overdue payment reminders.

mod common;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{dec, days_ago, item, spawn_studio, spawn_studio_with, today};
use service_core::error::AppError;
use std::sync::{Arc, Mutex};
use studio_service::models::{InvoiceStatus, RecordPayment};
use studio_service::services::notifier::{NotifierError, PaymentReminder};
use studio_service::services::{
    InvoiceLedger, MemoryStore, ReminderNotifier, ReminderRunSummary, Studio, StudioPolicy,
};
use uuid::Uuid;

/// Notifier that settles the other of two invoices in full during its first send,
/// as if the client paid while the scan was still running.
struct SettlesDuringScan {
    ledger: InvoiceLedger,
    account_id: Uuid,
    unpaid: Mutex<Vec<Uuid>>,
    sent: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl ReminderNotifier for SettlesDuringScan {
    async fn send(&self, reminder: &PaymentReminder) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(reminder.invoice_id);
        let others: Vec<Uuid> = std::mem::take(&mut *self.unpaid.lock().unwrap())
            .into_iter()
            .filter(|id| *id != reminder.invoice_id)
            .collect();
        for invoice_id in others {
            self.ledger
                .apply_payment(
                    invoice_id,
                    RecordPayment {
                        amount: dec("400"),
                        payment_date: None,
                        account_id: self.account_id,
                        method_notes: None,
                        recorded_by: None,
                    },
                )
                .await
                .map_err(|e| NotifierError::SendFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "settles-during-scan"
    }
}

#[tokio::test]
async fn disabled_flag_skips_the_whole_scan() {
    let t = spawn_studio();
    let fx = t.seed().await;
    t.invoice(&fx, vec![item("Album", 1, "400")], days_ago(30), days_ago(10))
        .await;

    let summary = t.studio.reminders.run_once().await.unwrap();

    assert_eq!(summary, ReminderRunSummary::default());
    assert_eq!(t.notifier.send_count(), 0);
}

#[tokio::test]
async fn overdue_invoice_is_reminded_once_per_window() {
    let t = spawn_studio();
    let fx = t.seed().await;
    t.enable_reminders().await;
    let invoice = t
        .invoice(&fx, vec![item("Album", 1, "400")], days_ago(30), days_ago(10))
        .await;
    assert_eq!(invoice.status(), InvoiceStatus::Overdue);

    let now = Utc::now();
    let first = t.studio.reminders.run_once_at(now).await.unwrap();
    assert!(first.enabled);
    assert_eq!((first.scanned, first.sent, first.skipped), (1, 1, 0));
    assert_eq!(t.notifier.sent_invoices(), vec![invoice.invoice_id]);

    let stored = t.studio.ledger.get_invoice(invoice.invoice_id).await.unwrap();
    assert_eq!(stored.invoice.last_reminder_sent, Some(now));

    let soon = t
        .studio
        .reminders
        .run_once_at(now + Duration::hours(2))
        .await
        .unwrap();
    assert_eq!((soon.sent, soon.skipped), (0, 1));

    let next_day = t
        .studio
        .reminders
        .run_once_at(now + Duration::hours(25))
        .await
        .unwrap();
    assert_eq!(next_day.sent, 1);
    assert_eq!(t.notifier.send_count(), 2);
}

#[tokio::test]
async fn settled_and_not_yet_due_invoices_are_left_alone() {
    let t = spawn_studio();
    let fx = t.seed().await;
    t.enable_reminders().await;
    let paid = t
        .invoice(&fx, vec![item("Album", 1, "400")], days_ago(30), days_ago(10))
        .await;
    t.studio
        .ledger
        .apply_payment(
            paid.invoice_id,
            RecordPayment {
                amount: dec("400"),
                payment_date: None,
                account_id: fx.account_id,
                method_notes: None,
                recorded_by: None,
            },
        )
        .await
        .unwrap();
    t.invoice(&fx, vec![item("Prints", 2, "50")], today(), today())
        .await;
    t.invoice(
        &fx,
        vec![item("Frame", 1, "90")],
        today(),
        today() + Duration::days(5),
    )
    .await;

    let summary = t.studio.reminders.run_once().await.unwrap();

    assert_eq!(summary.scanned, 0);
    assert_eq!(t.notifier.send_count(), 0);
}

#[tokio::test]
async fn invoice_paid_mid_scan_is_skipped_on_recheck() {
    let store = MemoryStore::with_default_workflow();
    let t = spawn_studio_with(store.clone());
    let fx = t.seed().await;
    t.enable_reminders().await;
    let a = t
        .invoice(&fx, vec![item("Album", 1, "400")], days_ago(30), days_ago(10))
        .await;
    let b = t
        .invoice(&fx, vec![item("Canvas", 1, "400")], days_ago(30), days_ago(10))
        .await;

    let store = Arc::new(store);
    let notifier = Arc::new(SettlesDuringScan {
        ledger: InvoiceLedger::new(store.clone(), StudioPolicy::default()),
        account_id: fx.account_id,
        unpaid: Mutex::new(vec![a.invoice_id, b.invoice_id]),
        sent: Mutex::new(Vec::new()),
    });
    let studio = Studio::new(store, notifier.clone(), StudioPolicy::default());

    let summary = studio.reminders.run_once().await.unwrap();
    assert_eq!(
        (summary.scanned, summary.sent, summary.skipped, summary.failed),
        (2, 1, 1, 0)
    );

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    let reminded = sent[0];
    let settled = if reminded == a.invoice_id {
        b.invoice_id
    } else {
        a.invoice_id
    };

    let reminded = studio.ledger.get_invoice(reminded).await.unwrap();
    assert!(reminded.invoice.last_reminder_sent.is_some());
    let settled = studio.ledger.get_invoice(settled).await.unwrap();
    assert_eq!(settled.invoice.status(), InvoiceStatus::Paid);
    assert_eq!(settled.invoice.last_reminder_sent, None);
}

#[tokio::test]
async fn delivery_failure_leaves_the_invoice_unmarked() {
    let t = spawn_studio();
    let fx = t.seed().await;
    t.enable_reminders().await;
    let invoice = t
        .invoice(&fx, vec![item("Album", 1, "400")], days_ago(30), days_ago(3))
        .await;
    t.notifier.set_failing(true);

    let summary = t.studio.reminders.run_once().await.unwrap();
    assert_eq!((summary.scanned, summary.sent, summary.failed), (1, 0, 1));

    let stored = t.studio.ledger.get_invoice(invoice.invoice_id).await.unwrap();
    assert_eq!(stored.invoice.last_reminder_sent, None);

    let manual = t.studio.reminders.remind_invoice(invoice.invoice_id).await;
    assert!(matches!(manual, Err(AppError::InternalError(_))));

    // Next scan retries once delivery recovers
    t.notifier.set_failing(false);
    let retry = t.studio.reminders.run_once().await.unwrap();
    assert_eq!(retry.sent, 1);
}

#[tokio::test]
async fn manual_reminder_ignores_flag_and_window_but_needs_overdue() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let overdue = t
        .invoice(&fx, vec![item("Album", 1, "400")], days_ago(30), days_ago(10))
        .await;
    let current = t
        .invoice(
            &fx,
            vec![item("Prints", 1, "80")],
            today(),
            today() + Duration::days(14),
        )
        .await;

    let first = t
        .studio
        .reminders
        .remind_invoice(overdue.invoice_id)
        .await
        .unwrap();
    assert!(first.last_reminder_sent.is_some());
    t.studio
        .reminders
        .remind_invoice(overdue.invoice_id)
        .await
        .unwrap();
    assert_eq!(t.notifier.send_count(), 2);

    let not_due = t.studio.reminders.remind_invoice(current.invoice_id).await;
    assert!(matches!(not_due, Err(AppError::InvalidState(_))));

    let missing = t.studio.reminders.remind_invoice(uuid::Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn scheduler_loop_stops_on_shutdown() {
    let t = spawn_studio();
    let scheduler = t.studio.reminders.clone();

    let handle = tokio::spawn(scheduler.clone().run(std::time::Duration::from_secs(3600)));
    tokio::task::yield_now().await;
    scheduler.shutdown();

    let stopped = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
    tokio_test::assert_ok!(stopped, "scheduler did not stop after shutdown");
    assert!(scheduler.shutdown_token().is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn scheduler_ticks_after_one_interval() {
    let t = spawn_studio();
    let fx = t.seed().await;
    t.enable_reminders().await;
    t.invoice(&fx, vec![item("Album", 1, "400")], days_ago(30), days_ago(10))
        .await;
    let scheduler = t.studio.reminders.clone();
    let handle = tokio::spawn(scheduler.clone().run(std::time::Duration::from_secs(60)));

    tokio::time::sleep(std::time::Duration::from_secs(30)).await;
    assert_eq!(t.notifier.send_count(), 0);

    tokio::time::sleep(std::time::Duration::from_secs(45)).await;
    assert_eq!(t.notifier.send_count(), 1);

    scheduler.shutdown();
    handle.await.unwrap();
}
