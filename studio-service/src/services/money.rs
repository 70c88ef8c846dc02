//! Money and status primitives: invoice totals, payment-derived status, aging.
//!
//! Everything here is pure. The ledger re-runs these after every write and
//! overwrites the cached columns with the result.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;

use crate::models::{Invoice, InvoiceItem, InvoiceStatus};

/// Sum of quantity x unit price over all items.
pub fn compute_amount(items: &[InvoiceItem]) -> Decimal {
    items
        .iter()
        .map(|item| Decimal::from(item.quantity) * item.unit_price)
        .sum()
}

/// Derive invoice status.
///
/// Paid needs a positive amount fully covered; an empty invoice is never Paid.
/// Otherwise a due date strictly before `today` makes it Overdue.
pub fn compute_status(
    amount: Decimal,
    amount_paid: Decimal,
    due_date: NaiveDate,
    today: NaiveDate,
) -> InvoiceStatus {
    if amount > Decimal::ZERO && amount_paid >= amount {
        InvoiceStatus::Paid
    } else if due_date < today {
        InvoiceStatus::Overdue
    } else {
        InvoiceStatus::Sent
    }
}

/// Reject empty item lists and non-positive quantities before anything is written.
pub fn validate_items(items: &[InvoiceItem]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::Invalid(anyhow::anyhow!(
            "Invoice must have at least one item"
        )));
    }
    for (i, item) in items.iter().enumerate() {
        if item.description.trim().is_empty() {
            return Err(AppError::Invalid(anyhow::anyhow!(
                "Item {} has an empty description",
                i + 1
            )));
        }
        if item.quantity <= 0 {
            return Err(AppError::Invalid(anyhow::anyhow!(
                "Item {} quantity must be positive, got {}",
                i + 1,
                item.quantity
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(AppError::Invalid(anyhow::anyhow!(
                "Item {} unit price must not be negative",
                i + 1
            )));
        }
    }
    Ok(())
}

/// Days-past-due bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingBucket {
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Over90,
}

/// Bucket for an invoice due on `due_date`, seen from `today`.
pub fn aging_bucket(due_date: NaiveDate, today: NaiveDate) -> AgingBucket {
    match (today - due_date).num_days() {
        d if d <= 0 => AgingBucket::Current,
        1..=30 => AgingBucket::Days1To30,
        31..=60 => AgingBucket::Days31To60,
        61..=90 => AgingBucket::Days61To90,
        _ => AgingBucket::Over90,
    }
}

/// Outstanding balances grouped by aging bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgingSummary {
    pub current: Decimal,
    pub days_1_to_30: Decimal,
    pub days_31_to_60: Decimal,
    pub days_61_to_90: Decimal,
    pub over_90: Decimal,
    pub total_outstanding: Decimal,
    pub invoice_count: usize,
}

/// Aggregate outstanding balances of unpaid invoices.
pub fn aging_summary(invoices: &[Invoice], today: NaiveDate) -> AgingSummary {
    let mut summary = AgingSummary::default();
    for invoice in invoices {
        let status = compute_status(invoice.amount, invoice.amount_paid, invoice.due_date, today);
        let outstanding = invoice.outstanding();
        if status == InvoiceStatus::Paid || outstanding.is_zero() {
            continue;
        }
        let slot = match aging_bucket(invoice.due_date, today) {
            AgingBucket::Current => &mut summary.current,
            AgingBucket::Days1To30 => &mut summary.days_1_to_30,
            AgingBucket::Days31To60 => &mut summary.days_31_to_60,
            AgingBucket::Days61To90 => &mut summary.days_61_to_90,
            AgingBucket::Over90 => &mut summary.over_90,
        };
        *slot += outstanding;
        summary.total_outstanding += outstanding;
        summary.invoice_count += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sqlx::types::Json;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(quantity: i32, unit_price: Decimal) -> InvoiceItem {
        InvoiceItem {
            description: "Portrait session".to_string(),
            quantity,
            unit_price,
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn invoice(amount: Decimal, paid: Decimal, due_date: NaiveDate) -> Invoice {
        let now = Utc::now();
        Invoice {
            invoice_id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            items: Json(vec![item(1, amount)]),
            amount,
            amount_overridden: false,
            amount_paid: paid,
            issue_date: due_date - Duration::days(14),
            due_date,
            status: "sent".to_string(),
            last_reminder_sent: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    #[test]
    fn amount_is_sum_of_quantity_times_price() {
        let items = vec![item(2, dec("150.00")), item(1, dec("99.50"))];
        assert_eq!(compute_amount(&items), dec("399.50"));
        assert_eq!(compute_amount(&[]), Decimal::ZERO);
    }

    #[test]
    fn full_payment_is_paid() {
        let today = day("2026-03-10");
        assert_eq!(
            compute_status(dec("500"), dec("500"), day("2026-03-20"), today),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn overpayment_is_paid() {
        let today = day("2026-03-10");
        assert_eq!(
            compute_status(dec("500"), dec("650"), day("2026-03-01"), today),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn past_due_unpaid_is_overdue() {
        let today = day("2026-03-10");
        assert_eq!(
            compute_status(dec("1000"), Decimal::ZERO, day("2026-03-09"), today),
            InvoiceStatus::Overdue
        );
    }

    #[test]
    fn due_today_is_not_overdue() {
        let today = day("2026-03-10");
        assert_eq!(
            compute_status(dec("1000"), dec("200"), today, today),
            InvoiceStatus::Sent
        );
    }

    #[test]
    fn zero_amount_is_never_paid() {
        let today = day("2026-03-10");
        assert_eq!(
            compute_status(Decimal::ZERO, Decimal::ZERO, day("2026-03-20"), today),
            InvoiceStatus::Sent
        );
        assert_eq!(
            compute_status(Decimal::ZERO, Decimal::ZERO, day("2026-03-01"), today),
            InvoiceStatus::Overdue
        );
    }

    #[test]
    fn item_validation_rejects_bad_input() {
        assert!(matches!(validate_items(&[]), Err(AppError::Invalid(_))));
        assert!(matches!(
            validate_items(&[item(0, dec("10"))]),
            Err(AppError::Invalid(_))
        ));
        assert!(matches!(
            validate_items(&[item(1, dec("-1"))]),
            Err(AppError::Invalid(_))
        ));
        assert!(validate_items(&[item(3, Decimal::ZERO)]).is_ok());
    }

    #[test]
    fn aging_buckets_by_days_past_due() {
        let today = day("2026-06-30");
        assert_eq!(aging_bucket(day("2026-07-01"), today), AgingBucket::Current);
        assert_eq!(aging_bucket(today, today), AgingBucket::Current);
        assert_eq!(aging_bucket(day("2026-06-29"), today), AgingBucket::Days1To30);
        assert_eq!(aging_bucket(day("2026-05-31"), today), AgingBucket::Days1To30);
        assert_eq!(aging_bucket(day("2026-05-30"), today), AgingBucket::Days31To60);
        assert_eq!(aging_bucket(day("2026-04-01"), today), AgingBucket::Days61To90);
        assert_eq!(aging_bucket(day("2026-01-01"), today), AgingBucket::Over90);
    }

    #[test]
    fn aging_summary_skips_paid_invoices() {
        let today = day("2026-06-30");
        let invoices = vec![
            invoice(dec("1000"), dec("400"), day("2026-06-20")),
            invoice(dec("500"), dec("500"), day("2026-01-01")),
            invoice(dec("300"), Decimal::ZERO, day("2026-07-15")),
            invoice(dec("200"), Decimal::ZERO, day("2026-02-01")),
        ];
        let summary = aging_summary(&invoices, today);
        assert_eq!(summary.days_1_to_30, dec("600"));
        assert_eq!(summary.current, dec("300"));
        assert_eq!(summary.over_90, dec("200"));
        assert_eq!(summary.total_outstanding, dec("1100"));
        assert_eq!(summary.invoice_count, 3);
    }
}
