//! Integration tests for client profiles, financial status and the catalog.

mod common;

use common::{dec, days_ago, item, spawn_studio, today};
use service_core::error::AppError;
use studio_service::models::{
    BookingStatus, CreateClient, CreateSessionPackage, FinancialStatus, RecordPayment,
    UpdateClient,
};

#[tokio::test]
async fn client_profile_can_be_patched_but_not_blanked() {
    let t = spawn_studio();
    let fx = t.seed().await;

    let updated = t
        .studio
        .clients
        .update_client(
            fx.client_id,
            UpdateClient {
                phone: Some("+91 90000 22222".to_string()),
                notes: Some("Prefers evening slots".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.client.name, "Asha Rao");
    assert_eq!(updated.client.phone.as_deref(), Some("+91 90000 22222"));
    assert_eq!(updated.financial_status, FinancialStatus::GoodStanding);

    let blank = t
        .studio
        .clients
        .update_client(
            fx.client_id,
            UpdateClient {
                name: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(blank, Err(AppError::Invalid(_))));

    let unnamed = t
        .studio
        .clients
        .create_client(CreateClient {
            name: String::new(),
            phone: None,
            email: None,
            join_date: None,
            notes: None,
        })
        .await;
    assert!(matches!(unnamed, Err(AppError::Invalid(_))));
}

#[tokio::test]
async fn new_client_joins_today_with_empty_stats() {
    let t = spawn_studio();
    let view = t
        .studio
        .clients
        .create_client(CreateClient {
            name: "Kabir".to_string(),
            phone: None,
            email: None,
            join_date: None,
            notes: None,
        })
        .await
        .unwrap();

    assert_eq!(view.client.join_date, today());
    assert_eq!(view.client.total_bookings, 0);
    assert_eq!(view.client.total_spent, dec("0"));
    assert_eq!(t.studio.clients.list_clients().await.unwrap().len(), 1);
}

#[tokio::test]
async fn big_spender_becomes_high_value() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let invoice = t
        .invoice(&fx, vec![item("Wedding collection", 1, "6000")], today(), today())
        .await;
    t.studio
        .ledger
        .apply_payment(
            invoice.invoice_id,
            RecordPayment {
                amount: dec("6000"),
                payment_date: None,
                account_id: fx.account_id,
                method_notes: None,
                recorded_by: None,
            },
        )
        .await
        .unwrap();

    let view = t.studio.clients.get_client(fx.client_id).await.unwrap();
    assert_eq!(view.client.total_spent, dec("6000"));
    assert_eq!(view.financial_status, FinancialStatus::HighValue);
}

#[tokio::test]
async fn an_overdue_invoice_outranks_high_value() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let big = t
        .invoice(&fx, vec![item("Wedding collection", 1, "6000")], today(), today())
        .await;
    t.studio
        .ledger
        .apply_payment(
            big.invoice_id,
            RecordPayment {
                amount: dec("6000"),
                payment_date: None,
                account_id: fx.account_id,
                method_notes: None,
                recorded_by: None,
            },
        )
        .await
        .unwrap();
    t.invoice(&fx, vec![item("Extra prints", 3, "40")], days_ago(20), days_ago(5))
        .await;

    let view = t.studio.clients.get_client(fx.client_id).await.unwrap();
    assert_eq!(view.financial_status, FinancialStatus::Overdue);
}

#[tokio::test]
async fn catalog_rows_in_use_cannot_be_deleted() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let booking = t.book(&fx, BookingStatus::Pending).await;

    let category = t.studio.catalog.delete_category(fx.category_id).await;
    assert!(matches!(category, Err(AppError::Conflict(_))));
    let package = t.studio.catalog.delete_package(fx.package_id).await;
    assert!(matches!(package, Err(AppError::Conflict(_))));
    let client = t.studio.clients.delete_client(fx.client_id).await;
    assert!(matches!(client, Err(AppError::Conflict(_))));

    t.studio
        .bookings
        .delete_booking(booking.booking_id)
        .await
        .unwrap();

    // Package still references the category
    let category = t.studio.catalog.delete_category(fx.category_id).await;
    assert!(matches!(category, Err(AppError::Conflict(_))));

    t.studio.catalog.delete_package(fx.package_id).await.unwrap();
    t.studio.catalog.delete_category(fx.category_id).await.unwrap();
    assert!(t.studio.catalog.list_categories().await.unwrap().is_empty());
    assert!(t.studio.catalog.list_packages().await.unwrap().is_empty());
}

#[tokio::test]
async fn package_rules() {
    let t = spawn_studio();
    let fx = t.seed().await;

    let negative = t
        .studio
        .catalog
        .create_package(CreateSessionPackage {
            category_id: fx.category_id,
            name: "Refund".to_string(),
            price: dec("-1"),
        })
        .await;
    assert!(matches!(negative, Err(AppError::Invalid(_))));

    let orphan = t
        .studio
        .catalog
        .create_package(CreateSessionPackage {
            category_id: uuid::Uuid::new_v4(),
            name: "Mini".to_string(),
            price: dec("200"),
        })
        .await;
    assert!(matches!(orphan, Err(AppError::NotFound(_))));

    let free = t
        .studio
        .catalog
        .create_package(CreateSessionPackage {
            category_id: fx.category_id,
            name: "Complimentary".to_string(),
            price: dec("0"),
        })
        .await
        .unwrap();
    assert_eq!(free.price, dec("0"));

    let accounts = t.studio.catalog.list_payment_accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].name, "Bank");
}
