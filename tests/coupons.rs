//! Coupon validation and pricing through the reservation service.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use atrium_server::models::CouponKind;
use atrium_server::services::ReservationService;
use atrium_server::store::{EntitlementStore, MemStore};
use common::{make_coupon, make_event};

async fn setup() -> (Arc<MemStore>, ReservationService, Uuid) {
    let store = Arc::new(MemStore::new());
    let event = make_event(None, 1000);
    let event_id = event.id;
    store.add_event(event).await;
    let service = ReservationService::new(store.clone() as Arc<dyn EntitlementStore>);
    (store, service, event_id)
}

#[tokio::test]
async fn percent_coupon_discounts_and_rounds_down() {
    let (store, service, event_id) = setup().await;
    store
        .add_coupon(make_coupon(event_id, "SAVE20", CouponKind::Percent, 20))
        .await;

    let quote = service
        .validate_coupon(event_id, "SAVE20", 1000)
        .await
        .unwrap();
    assert!(quote.valid);
    assert_eq!(quote.amount_cents, 800);
}

#[tokio::test]
async fn fixed_coupon_never_goes_negative() {
    let (store, service, event_id) = setup().await;
    store
        .add_coupon(make_coupon(event_id, "OFF300", CouponKind::Fixed, 300))
        .await;

    let quote = service
        .validate_coupon(event_id, "OFF300", 250)
        .await
        .unwrap();
    assert!(quote.valid);
    assert_eq!(quote.amount_cents, 0);
}

#[tokio::test]
async fn unknown_code_returns_original_amount_invalid() {
    let (_store, service, event_id) = setup().await;

    let quote = service
        .validate_coupon(event_id, "NOPE", 1234)
        .await
        .unwrap();
    assert!(!quote.valid);
    assert_eq!(quote.amount_cents, 1234);
}

#[tokio::test]
async fn codes_are_case_sensitive() {
    let (store, service, event_id) = setup().await;
    store
        .add_coupon(make_coupon(event_id, "Save10", CouponKind::Percent, 10))
        .await;

    let quote = service
        .validate_coupon(event_id, "SAVE10", 1000)
        .await
        .unwrap();
    assert!(!quote.valid);
    assert_eq!(quote.amount_cents, 1000);
}

#[tokio::test]
async fn expired_coupon_is_invalid() {
    let (store, service, event_id) = setup().await;
    let mut coupon = make_coupon(event_id, "LATE", CouponKind::Percent, 50);
    coupon.expires_at = Some(Utc::now() - Duration::minutes(1));
    store.add_coupon(coupon).await;

    let quote = service.validate_coupon(event_id, "LATE", 1000).await.unwrap();
    assert!(!quote.valid);
    assert_eq!(quote.amount_cents, 1000);
}

#[tokio::test]
async fn coupon_scoped_to_its_event() {
    let (store, service, event_id) = setup().await;
    let other_event = make_event(None, 1000);
    store
        .add_coupon(make_coupon(other_event.id, "ELSEWHERE", CouponKind::Fixed, 100))
        .await;
    store.add_event(other_event).await;

    let quote = service
        .validate_coupon(event_id, "ELSEWHERE", 1000)
        .await
        .unwrap();
    assert!(!quote.valid);
}

#[tokio::test]
async fn reservation_with_coupon_prices_and_redeems() {
    let (store, service, event_id) = setup().await;
    let coupon = make_coupon(event_id, "SAVE20", CouponKind::Percent, 20);
    store.add_coupon(coupon).await;

    // 1 seat + 1 guest at 1000 cents each = 2000, minus 20% = 1600.
    let outcome = service
        .create(event_id, Uuid::new_v4(), 1, Some("SAVE20"))
        .await
        .unwrap();
    assert!(outcome.coupon_applied);
    assert_eq!(outcome.price_cents, 1600);

    let stored = store.find_coupon(event_id, "SAVE20").await.unwrap().unwrap();
    assert_eq!(stored.used_count, 1);
}

#[tokio::test]
async fn usage_limit_exhausts_a_coupon() {
    let (store, service, event_id) = setup().await;
    let mut coupon = make_coupon(event_id, "ONCE", CouponKind::Fixed, 100);
    coupon.max_uses = Some(1);
    store.add_coupon(coupon).await;

    let first = service
        .create(event_id, Uuid::new_v4(), 0, Some("ONCE"))
        .await
        .unwrap();
    assert!(first.coupon_applied);

    // The single use is spent; the next reservation still succeeds but at
    // full price.
    let second = service
        .create(event_id, Uuid::new_v4(), 0, Some("ONCE"))
        .await
        .unwrap();
    assert!(!second.coupon_applied);
    assert_eq!(second.price_cents, 1000);
}

#[tokio::test]
async fn concurrent_redeemers_never_exceed_max_uses() {
    let (store, service, event_id) = setup().await;
    let mut coupon = make_coupon(event_id, "ONCE", CouponKind::Fixed, 100);
    coupon.max_uses = Some(1);
    store.add_coupon(coupon).await;

    let service = Arc::new(service);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.create(event_id, Uuid::new_v4(), 0, Some("ONCE")).await
        }));
    }

    // All eight may quote the discount before any redemption lands, but
    // only one can spend the single use; the rest pay full price.
    let mut discounted = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        if outcome.coupon_applied {
            discounted += 1;
            assert_eq!(outcome.price_cents, 900);
        } else {
            assert_eq!(outcome.price_cents, 1000);
        }
    }
    assert_eq!(discounted, 1);

    let stored = store.find_coupon(event_id, "ONCE").await.unwrap().unwrap();
    assert_eq!(stored.used_count, 1);
}
