//! Reservation capacity accounting under concurrency and cancellation.

mod common;

use std::sync::Arc;

use uuid::Uuid;

use atrium_server::services::ReservationService;
use atrium_server::store::{EntitlementStore, MemStore};
use atrium_server::utils::error::AppError;
use common::make_event;

async fn setup(capacity: Option<i32>) -> (Arc<MemStore>, Arc<ReservationService>, Uuid) {
    let store = Arc::new(MemStore::new());
    let event = make_event(capacity, 0);
    let event_id = event.id;
    store.add_event(event).await;
    let service = Arc::new(ReservationService::new(
        store.clone() as Arc<dyn EntitlementStore>
    ));
    (store, service, event_id)
}

#[tokio::test]
async fn concurrent_reservers_never_overshoot_capacity() {
    let (store, service, event_id) = setup(Some(5)).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.create(event_id, Uuid::new_v4(), 0, None).await
        }));
    }

    let mut confirmed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => confirmed += 1,
            Err(AppError::CapacityExceeded(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(confirmed, 5);
    assert_eq!(rejected, 3);
    assert_eq!(store.confirmed_seats(event_id).await, 5);
}

#[tokio::test]
async fn guests_count_against_capacity() {
    let (store, service, event_id) = setup(Some(4)).await;

    // 1 attendee + 2 guests = 3 seats
    service
        .create(event_id, Uuid::new_v4(), 2, None)
        .await
        .unwrap();
    assert_eq!(store.confirmed_seats(event_id).await, 3);

    // 2 more seats would overshoot
    let err = service
        .create(event_id, Uuid::new_v4(), 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(_)));

    // 1 seat still fits exactly
    service
        .create(event_id, Uuid::new_v4(), 0, None)
        .await
        .unwrap();
    assert_eq!(store.confirmed_seats(event_id).await, 4);
}

#[tokio::test]
async fn cancellation_frees_capacity_immediately() {
    // Full scenario: capacity 2, user A takes both seats, user B is turned
    // away until A cancels.
    let (_store, service, event_id) = setup(Some(2)).await;
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();

    let outcome = service.create(event_id, user_a, 1, None).await.unwrap();

    let err = service.create(event_id, user_b, 0, None).await.unwrap_err();
    assert!(matches!(err, AppError::CapacityExceeded(_)));

    service
        .cancel(outcome.reservation.id, Some(user_a))
        .await
        .unwrap();

    service.create(event_id, user_b, 0, None).await.unwrap();
}

#[tokio::test]
async fn unlimited_capacity_accepts_any_volume() {
    let (store, service, event_id) = setup(None).await;
    for _ in 0..50 {
        service
            .create(event_id, Uuid::new_v4(), 1, None)
            .await
            .unwrap();
    }
    assert_eq!(store.confirmed_seats(event_id).await, 100);
}

#[tokio::test]
async fn reserving_a_missing_event_is_not_found() {
    let store = Arc::new(MemStore::new());
    let service = ReservationService::new(store as Arc<dyn EntitlementStore>);
    let err = service
        .create(Uuid::new_v4(), Uuid::new_v4(), 0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn only_owner_or_admin_may_cancel() {
    let (_store, service, event_id) = setup(Some(10)).await;
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let outcome = service.create(event_id, owner, 0, None).await.unwrap();

    let err = service
        .cancel(outcome.reservation.id, Some(stranger))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // The trusted admin surface cancels on the user's behalf.
    service.cancel(outcome.reservation.id, None).await.unwrap();
}

#[tokio::test]
async fn negative_guest_count_is_rejected() {
    let (_store, service, event_id) = setup(Some(10)).await;
    let err = service
        .create(event_id, Uuid::new_v4(), -1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}
