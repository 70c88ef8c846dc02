//! Overdue invoice reminders.
//!
//! A server-owned ticker scans unpaid invoices past their due date while the
//! persisted automation flag is on. Each invoice is re-read under its row lock
//! at visit time, so a payment that lands after the scan started is seen and
//! the invoice is skipped. Delivery happens outside any transaction; only the
//! reminder timestamp is written afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::models::{Invoice, InvoiceFilter, InvoiceStatus};
use crate::services::ledger::settle;
use crate::services::metrics::REMINDERS_TOTAL;
use crate::services::notifier::{PaymentReminder, ReminderNotifier};
use crate::services::store::Store;
use crate::services::StudioPolicy;

/// Counts from one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderRunSummary {
    pub enabled: bool,
    pub scanned: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Visit {
    Send(PaymentReminder),
    Skip(&'static str),
}

/// Periodic reminder dispatcher.
pub struct ReminderScheduler {
    store: Arc<dyn Store>,
    notifier: Arc<dyn ReminderNotifier>,
    policy: StudioPolicy,
    shutdown_token: CancellationToken,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn ReminderNotifier>,
        policy: StudioPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            policy,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Token that stops [`ReminderScheduler::run`] when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn shutdown(&self) {
        info!("Stopping reminder scheduler");
        self.shutdown_token.cancel();
    }

    /// Tick until shut down. The first scan runs one full interval after start.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        info!(
            interval_secs = interval.as_secs(),
            notifier = self.notifier.name(),
            "Reminder scheduler started"
        );
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    info!("Reminder scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(summary) if summary.enabled => info!(
                            scanned = summary.scanned,
                            sent = summary.sent,
                            skipped = summary.skipped,
                            failed = summary.failed,
                            "Reminder scan finished"
                        ),
                        Ok(_) => debug!("Automated reminders disabled, scan skipped"),
                        Err(e) => warn!(error = %e, "Reminder scan failed"),
                    }
                }
            }
        }
    }

    pub async fn run_once(&self) -> Result<ReminderRunSummary, AppError> {
        self.run_once_at(Utc::now()).await
    }

    /// One scan as of `now`. Does nothing while the automation flag is off.
    #[instrument(skip(self))]
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<ReminderRunSummary, AppError> {
        let candidates = {
            let mut uow = self.store.begin().await?;
            if !uow.get_settings().await?.automated_reminders_enabled {
                return Ok(ReminderRunSummary::default());
            }
            uow.list_invoices(&InvoiceFilter {
                unpaid_due_before: Some(now.date_naive()),
                ..Default::default()
            })
            .await?
        };

        let mut summary = ReminderRunSummary {
            enabled: true,
            ..Default::default()
        };
        for candidate in candidates {
            if self.shutdown_token.is_cancelled() {
                debug!("Shutdown requested, stopping scan early");
                break;
            }
            summary.scanned += 1;

            let visit = match self.visit(candidate.invoice_id, now, false).await {
                Ok(visit) => visit,
                Err(e) => {
                    warn!(invoice_id = %candidate.invoice_id, error = %e, "Reminder check failed");
                    summary.failed += 1;
                    REMINDERS_TOTAL.with_label_values(&["failed"]).inc();
                    continue;
                }
            };
            match visit {
                Visit::Skip(reason) => {
                    debug!(invoice_id = %candidate.invoice_id, reason, "Reminder skipped");
                    summary.skipped += 1;
                    REMINDERS_TOTAL.with_label_values(&["skipped"]).inc();
                }
                Visit::Send(reminder) => match self.dispatch(&reminder, now).await {
                    Ok(_) => summary.sent += 1,
                    Err(e) => {
                        warn!(invoice_id = %reminder.invoice_id, error = %e, "Reminder not sent");
                        summary.failed += 1;
                    }
                },
            }
        }
        Ok(summary)
    }

    /// Send a reminder now, whatever the automation flag or resend window.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn remind_invoice(&self, invoice_id: Uuid) -> Result<Invoice, AppError> {
        let now = Utc::now();
        match self.visit(invoice_id, now, true).await? {
            Visit::Send(reminder) => self.dispatch(&reminder, now).await,
            Visit::Skip(reason) => Err(AppError::InvalidState(anyhow::anyhow!(
                "Invoice {} cannot be reminded: {}",
                invoice_id,
                reason
            ))),
        }
    }

    /// Re-read the invoice under lock, persist any status drift, and decide.
    async fn visit(
        &self,
        invoice_id: Uuid,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<Visit, AppError> {
        let mut uow = self.store.begin().await?;
        let mut invoice = uow.lock_invoice(invoice_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id))
        })?;

        let before = invoice.status.clone();
        invoice.amount_paid = uow.sum_payments(invoice_id).await?;
        settle(&mut invoice, now.date_naive());
        if invoice.status != before {
            invoice.updated_utc = now;
            uow.save_invoice(&invoice).await?;
            debug!(from = %before, to = %invoice.status, "Invoice status re-derived");
        }

        if invoice.status() != InvoiceStatus::Overdue {
            uow.commit().await?;
            return Ok(Visit::Skip("not overdue"));
        }
        let recently_reminded = invoice
            .last_reminder_sent
            .is_some_and(|sent| now - sent < self.policy.reminder_resend_after);
        if !force && recently_reminded {
            uow.commit().await?;
            return Ok(Visit::Skip("reminded recently"));
        }

        let client = uow.get_client(invoice.client_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Client {} not found", invoice.client_id))
        })?;
        let settings = uow.get_settings().await?;
        uow.commit().await?;

        Ok(Visit::Send(PaymentReminder {
            invoice_id,
            client_id: client.client_id,
            client_name: client.name,
            phone: client.phone,
            email: client.email,
            studio_name: settings.studio_name,
            outstanding: invoice.outstanding(),
            due_date: invoice.due_date,
        }))
    }

    /// Deliver, then record the send in its own short unit of work.
    async fn dispatch(
        &self,
        reminder: &PaymentReminder,
        now: DateTime<Utc>,
    ) -> Result<Invoice, AppError> {
        if let Err(e) = self.notifier.send(reminder).await {
            REMINDERS_TOTAL.with_label_values(&["failed"]).inc();
            return Err(AppError::InternalError(anyhow::anyhow!(
                "Reminder delivery via {} failed: {}",
                self.notifier.name(),
                e
            )));
        }

        let mut uow = self.store.begin().await?;
        uow.mark_reminder_sent(reminder.invoice_id, now).await?;
        let invoice = uow.get_invoice(reminder.invoice_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Invoice {} not found", reminder.invoice_id))
        })?;
        uow.commit().await?;

        REMINDERS_TOTAL.with_label_values(&["sent"]).inc();
        info!(
            invoice_id = %reminder.invoice_id,
            outstanding = %reminder.outstanding,
            "Payment reminder sent"
        );
        Ok(invoice)
    }
}
