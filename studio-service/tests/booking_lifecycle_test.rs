//! Integration tests for the booking lifecycle.

mod common;

use chrono::{Duration, Utc};
use common::{dec, spawn_studio};
use service_core::error::AppError;
use studio_service::models::{
    BookingFilter, BookingStatus, CreateBooking, CreateSessionPackage, EditingJobFilter,
    RecordPayment, UpdateBooking,
};
use uuid::Uuid;

fn to(status: BookingStatus) -> UpdateBooking {
    UpdateBooking {
        status: Some(status),
        ..Default::default()
    }
}

#[tokio::test]
async fn new_booking_defaults_to_pending() {
    let t = spawn_studio();
    let fx = t.seed().await;

    let booking = t
        .studio
        .bookings
        .create_booking(CreateBooking {
            client_id: fx.client_id,
            session_category_id: fx.category_id,
            session_package_id: fx.package_id,
            photographer_id: None,
            session_date: Utc::now() + Duration::days(3),
            status: None,
            notes: Some("Golden hour".to_string()),
            location: None,
        })
        .await
        .unwrap();

    assert_eq!(booking.status(), BookingStatus::Pending);
    assert!(booking.photo_selections.is_empty());
    assert_eq!(booking.invoice_id, None);
}

#[tokio::test]
async fn booking_requires_known_client_and_matching_package() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let portraits = t
        .studio
        .catalog
        .create_category("Portraits", None)
        .await
        .unwrap();
    let mut input = CreateBooking {
        client_id: Uuid::new_v4(),
        session_category_id: fx.category_id,
        session_package_id: fx.package_id,
        photographer_id: None,
        session_date: Utc::now(),
        status: None,
        notes: None,
        location: None,
    };

    let unknown_client = t.studio.bookings.create_booking(input.clone()).await;
    assert!(matches!(unknown_client, Err(AppError::NotFound(_))));

    input.client_id = fx.client_id;
    input.session_category_id = portraits.category_id;
    let mismatched = t.studio.bookings.create_booking(input.clone()).await;
    assert!(matches!(mismatched, Err(AppError::Invalid(_))));

    input.session_category_id = fx.category_id;
    input.status = Some(BookingStatus::Cancelled);
    let cancelled = t.studio.bookings.create_booking(input).await;
    assert!(matches!(cancelled, Err(AppError::Invalid(_))));
}

#[tokio::test]
async fn allowed_transitions_succeed() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let booking = t.book(&fx, BookingStatus::Pending).await;

    let confirmed = t
        .studio
        .bookings
        .update_booking(booking.booking_id, to(BookingStatus::Confirmed))
        .await
        .unwrap();
    assert_eq!(confirmed.status(), BookingStatus::Confirmed);

    let back = t
        .studio
        .bookings
        .update_booking(booking.booking_id, to(BookingStatus::Pending))
        .await
        .unwrap();
    assert_eq!(back.status(), BookingStatus::Pending);

    let completed = t
        .studio
        .bookings
        .update_booking(booking.booking_id, to(BookingStatus::Completed))
        .await
        .unwrap();
    assert_eq!(completed.status(), BookingStatus::Completed);
}

#[tokio::test]
async fn terminal_states_reject_moves_except_cancellation() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let completed = t.book(&fx, BookingStatus::Completed).await;

    let reopen = t
        .studio
        .bookings
        .update_booking(completed.booking_id, to(BookingStatus::Pending))
        .await;
    assert!(matches!(reopen, Err(AppError::InvalidState(_))));

    let cancelled = t
        .studio
        .bookings
        .update_booking(completed.booking_id, to(BookingStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.status(), BookingStatus::Cancelled);

    let revive = t
        .studio
        .bookings
        .update_booking(completed.booking_id, to(BookingStatus::Confirmed))
        .await;
    assert!(matches!(revive, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn completing_opens_exactly_one_editing_job() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let booking = t.book(&fx, BookingStatus::Confirmed).await;

    t.studio
        .bookings
        .update_booking(booking.booking_id, to(BookingStatus::Completed))
        .await
        .unwrap();
    // Saving the completed booking again must not open a second job
    t.studio
        .bookings
        .update_booking(
            booking.booking_id,
            UpdateBooking {
                status: Some(BookingStatus::Completed),
                notes: Some("Delivered raw files".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let jobs = t
        .studio
        .editing
        .list_jobs(&EditingJobFilter::default())
        .await
        .unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].booking_id, booking.booking_id);
    assert_eq!(jobs[0].client_id, fx.client_id);
    assert_eq!(jobs[0].revision_count, 0);
    assert_eq!(jobs[0].editor_id, None);

    let statuses = t.studio.editing.list_statuses().await.unwrap();
    assert_eq!(jobs[0].status_id, statuses[0].status_id);
}

#[tokio::test]
async fn completed_bookings_drive_the_client_booking_count() {
    let t = spawn_studio();
    let fx = t.seed().await;
    t.book(&fx, BookingStatus::Completed).await;
    let pending = t.book(&fx, BookingStatus::Pending).await;

    let client = t.studio.clients.get_client(fx.client_id).await.unwrap();
    assert_eq!(client.client.total_bookings, 1);

    t.studio
        .bookings
        .update_booking(pending.booking_id, to(BookingStatus::Completed))
        .await
        .unwrap();
    let client = t.studio.clients.get_client(fx.client_id).await.unwrap();
    assert_eq!(client.client.total_bookings, 2);
}

#[tokio::test]
async fn changing_package_checks_the_category() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let booking = t.book(&fx, BookingStatus::Pending).await;
    let half_day = t
        .studio
        .catalog
        .create_package(CreateSessionPackage {
            category_id: fx.category_id,
            name: "Half Day".to_string(),
            price: dec("800"),
        })
        .await
        .unwrap();
    let other = t
        .studio
        .catalog
        .create_category("Maternity", None)
        .await
        .unwrap();

    let moved = t
        .studio
        .bookings
        .update_booking(
            booking.booking_id,
            UpdateBooking {
                session_package_id: Some(half_day.package_id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.session_package_id, half_day.package_id);

    let mismatched = t
        .studio
        .bookings
        .update_booking(
            booking.booking_id,
            UpdateBooking {
                session_category_id: Some(other.category_id),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(mismatched, Err(AppError::Invalid(_))));
}

#[tokio::test]
async fn deleting_a_booking_cascades_and_refreshes_stats() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let booking = t.book(&fx, BookingStatus::Completed).await;
    let invoice = t
        .studio
        .ledger
        .create_from_booking(booking.booking_id)
        .await
        .unwrap();
    t.studio
        .ledger
        .apply_payment(
            invoice.invoice_id,
            RecordPayment {
                amount: dec("1500"),
                payment_date: None,
                account_id: fx.account_id,
                method_notes: None,
                recorded_by: None,
            },
        )
        .await
        .unwrap();

    let before = t.studio.clients.get_client(fx.client_id).await.unwrap();
    assert_eq!(before.client.total_bookings, 1);
    assert_eq!(before.client.total_spent, dec("1500"));

    t.studio
        .bookings
        .delete_booking(booking.booking_id)
        .await
        .unwrap();

    let booking_gone = t.studio.bookings.get_booking(booking.booking_id).await;
    assert!(matches!(booking_gone, Err(AppError::NotFound(_))));
    let invoice_gone = t.studio.ledger.get_invoice(invoice.invoice_id).await;
    assert!(matches!(invoice_gone, Err(AppError::NotFound(_))));
    let jobs = t
        .studio
        .editing
        .list_jobs(&EditingJobFilter::default())
        .await
        .unwrap();
    assert!(jobs.is_empty());

    let after = t.studio.clients.get_client(fx.client_id).await.unwrap();
    assert_eq!(after.client.total_bookings, 0);
    assert_eq!(after.client.total_spent, dec("0"));

    // With no bookings left the client can go too
    t.studio.clients.delete_client(fx.client_id).await.unwrap();
}

#[tokio::test]
async fn list_filters_by_status_and_client() {
    let t = spawn_studio();
    let fx = t.seed().await;
    t.book(&fx, BookingStatus::Pending).await;
    t.book(&fx, BookingStatus::Confirmed).await;
    t.book(&fx, BookingStatus::Confirmed).await;

    let confirmed = t
        .studio
        .bookings
        .list_bookings(&BookingFilter {
            status: Some(BookingStatus::Confirmed),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 2);

    let stranger = t
        .studio
        .bookings
        .list_bookings(&BookingFilter {
            client_id: Some(Uuid::new_v4()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(stranger.is_empty());
}

#[tokio::test]
async fn photo_selections_add_remove_and_toggle() {
    let t = spawn_studio();
    let fx = t.seed().await;
    let booking = t.book(&fx, BookingStatus::Completed).await;
    let id = booking.booking_id;

    t.studio.bookings.add_selection(id, "IMG_0001.jpg").await.unwrap();
    t.studio.bookings.add_selection(id, "IMG_0002.jpg").await.unwrap();
    let again = t.studio.bookings.add_selection(id, "IMG_0001.jpg").await.unwrap();
    assert_eq!(again.photo_selections.len(), 2);

    let toggled = t
        .studio
        .bookings
        .toggle_selection_edited(id, "IMG_0002.jpg")
        .await
        .unwrap();
    let edited: Vec<bool> = toggled.photo_selections.iter().map(|p| p.edited).collect();
    assert_eq!(edited, vec![false, true]);

    let missing = t.studio.bookings.toggle_selection_edited(id, "nope.jpg").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let blank = t.studio.bookings.add_selection(id, "   ").await;
    assert!(matches!(blank, Err(AppError::Invalid(_))));

    let removed = t
        .studio
        .bookings
        .remove_selection(id, "IMG_0001.jpg")
        .await
        .unwrap();
    assert_eq!(removed.photo_selections.len(), 1);
    assert_eq!(removed.photo_selections[0].name, "IMG_0002.jpg");

    let unknown = t.studio.bookings.remove_selection(id, "IMG_9999.jpg").await.unwrap();
    assert_eq!(unknown.photo_selections.len(), 1);
}
