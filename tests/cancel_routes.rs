//! Cancellation authority at the HTTP layer: the public handler only ever
//! acts as the caller named in the body, and the admin override lives on
//! its own route.

mod common;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use atrium_server::handlers::events::{
    admin_cancel_reservation, cancel_reservation, CancelReservationRequest,
};
use atrium_server::services::{
    MembershipReconciler, ReservationService, TicketIssuer, TierService,
};
use atrium_server::state::AppState;
use atrium_server::store::{EntitlementStore, MemStore};
use atrium_server::utils::error::AppError;
use common::{make_event, FakeBilling, FakeChat, FakeRenderer, FakeStorage};

fn app_state(store: Arc<MemStore>) -> AppState {
    let store = store as Arc<dyn EntitlementStore>;
    AppState {
        tiers: Arc::new(TierService::new(store.clone())),
        reconciler: Arc::new(MembershipReconciler::new(
            store.clone(),
            Arc::new(FakeBilling::default()),
            Arc::new(FakeChat::default()),
        )),
        reservations: Arc::new(ReservationService::new(store.clone())),
        tickets: Arc::new(TicketIssuer::new(
            store,
            Arc::new(FakeRenderer::default()),
            Arc::new(FakeStorage::default()),
        )),
    }
}

async fn setup() -> (AppState, Uuid) {
    let store = Arc::new(MemStore::new());
    let event = make_event(Some(10), 0);
    let event_id = event.id;
    store.add_event(event).await;

    let outcome = ReservationService::new(store.clone() as Arc<dyn EntitlementStore>)
        .create(event_id, Uuid::new_v4(), 0, None)
        .await
        .unwrap();

    (app_state(store), outcome.reservation.id)
}

#[tokio::test]
async fn public_cancel_acts_only_as_the_named_caller() {
    let (state, reservation_id) = setup().await;

    // The request body carries nothing but the caller's id, so a stranger
    // has no way to claim administrative authority.
    let err = cancel_reservation(
        State(state),
        Path(reservation_id),
        Json(CancelReservationRequest {
            user_id: Uuid::new_v4(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn admin_route_cancels_without_ownership() {
    let (state, reservation_id) = setup().await;

    admin_cancel_reservation(State(state), Path(reservation_id))
        .await
        .unwrap();
}
