//! Client stats aggregation.
//!
//! `total_bookings` and `total_spent` on the client row are caches. They are
//! recomputed from scratch inside every unit of work that touches a booking or
//! invoice of the client, never incremented.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::models::{
    Booking, BookingFilter, BookingStatus, Client, ClientStats, FinancialStatus, Invoice,
    InvoiceFilter, InvoiceStatus,
};
use crate::services::money::compute_status;
use crate::services::store::UnitOfWork;

/// Count completed bookings and sum what was paid on paid invoices.
pub fn aggregate(bookings: &[Booking], invoices: &[Invoice]) -> ClientStats {
    let total_bookings = bookings
        .iter()
        .filter(|b| b.status() == BookingStatus::Completed)
        .count() as i64;
    let total_spent = invoices
        .iter()
        .filter(|i| i.status() == InvoiceStatus::Paid)
        .map(|i| i.amount_paid)
        .sum();
    ClientStats {
        total_bookings,
        total_spent,
    }
}

/// Overdue beats High Value; anything else is Good Standing.
///
/// Invoice status is re-derived against `today` so a cached Sent that has
/// since passed its due date still counts as Overdue.
pub fn derive_financial_status(
    total_spent: Decimal,
    invoices: &[Invoice],
    high_value_threshold: Decimal,
    today: NaiveDate,
) -> FinancialStatus {
    let overdue = invoices.iter().any(|i| {
        compute_status(i.amount, i.amount_paid, i.due_date, today) == InvoiceStatus::Overdue
    });
    if overdue {
        FinancialStatus::Overdue
    } else if total_spent > high_value_threshold {
        FinancialStatus::HighValue
    } else {
        FinancialStatus::GoodStanding
    }
}

/// Recompute and persist a client's cached stats.
///
/// Locks the client row first so concurrent refreshes for the same client
/// serialize. A client that no longer exists is skipped.
#[instrument(skip(uow), fields(client_id = %client_id))]
pub async fn refresh_in(
    uow: &mut dyn UnitOfWork,
    client_id: Uuid,
) -> Result<Option<Client>, AppError> {
    let Some(mut client) = uow.lock_client(client_id).await? else {
        debug!("Client gone, skipping stats refresh");
        return Ok(None);
    };

    let bookings = uow
        .list_bookings(&BookingFilter {
            client_id: Some(client_id),
            ..Default::default()
        })
        .await?;
    let invoices = uow
        .list_invoices(&InvoiceFilter {
            client_id: Some(client_id),
            ..Default::default()
        })
        .await?;

    let stats = aggregate(&bookings, &invoices);
    if client.total_bookings != stats.total_bookings || client.total_spent != stats.total_spent {
        client.total_bookings = stats.total_bookings;
        client.total_spent = stats.total_spent;
        client.updated_utc = Utc::now();
        uow.save_client(&client).await?;
        debug!(
            total_bookings = stats.total_bookings,
            total_spent = %stats.total_spent,
            "Client stats refreshed"
        );
    }
    Ok(Some(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceItem;
    use chrono::Duration;
    use sqlx::types::Json;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn booking(status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            booking_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            session_category_id: Uuid::new_v4(),
            session_package_id: Uuid::new_v4(),
            photographer_id: None,
            session_date: now,
            status: status.as_str().to_string(),
            invoice_id: None,
            notes: None,
            location: None,
            photo_selections: Json(Vec::new()),
            created_utc: now,
            updated_utc: now,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    fn invoice(amount: &str, paid: &str, status: InvoiceStatus) -> Invoice {
        let now = Utc::now();
        let today = today();
        Invoice {
            invoice_id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            items: Json(vec![InvoiceItem {
                description: "Session".to_string(),
                quantity: 1,
                unit_price: dec(amount),
            }]),
            amount: dec(amount),
            amount_overridden: false,
            amount_paid: dec(paid),
            issue_date: today,
            due_date: today + Duration::days(14),
            status: status.as_str().to_string(),
            last_reminder_sent: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    #[test]
    fn only_completed_bookings_and_paid_invoices_count() {
        let bookings = vec![
            booking(BookingStatus::Completed),
            booking(BookingStatus::Pending),
            booking(BookingStatus::Cancelled),
        ];
        let invoices = vec![
            invoice("3000", "3000", InvoiceStatus::Paid),
            invoice("2000", "500", InvoiceStatus::Sent),
            invoice("800", "0", InvoiceStatus::Overdue),
        ];
        let stats = aggregate(&bookings, &invoices);
        assert_eq!(stats.total_bookings, 1);
        assert_eq!(stats.total_spent, dec("3000"));
    }

    #[test]
    fn overpaid_invoice_counts_what_was_paid() {
        let invoices = vec![invoice("1000", "1200", InvoiceStatus::Paid)];
        assert_eq!(aggregate(&[], &invoices).total_spent, dec("1200"));
    }

    #[test]
    fn overdue_takes_priority_over_high_value() {
        let mut late = invoice("100", "0", InvoiceStatus::Overdue);
        late.due_date = today() - Duration::days(3);
        assert_eq!(
            derive_financial_status(dec("9000"), &[late], dec("5000"), today()),
            FinancialStatus::Overdue
        );
    }

    #[test]
    fn stale_sent_invoice_past_due_is_overdue() {
        let mut stale = invoice("100", "0", InvoiceStatus::Sent);
        stale.due_date = today() - Duration::days(1);
        assert_eq!(
            derive_financial_status(Decimal::ZERO, &[stale], dec("5000"), today()),
            FinancialStatus::Overdue
        );
    }

    #[test]
    fn high_value_is_strictly_above_threshold() {
        assert_eq!(
            derive_financial_status(dec("5000"), &[], dec("5000"), today()),
            FinancialStatus::GoodStanding
        );
        assert_eq!(
            derive_financial_status(dec("5000.01"), &[], dec("5000"), today()),
            FinancialStatus::HighValue
        );
    }
}
