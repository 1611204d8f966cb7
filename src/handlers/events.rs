use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub amount_cents: i64,
}

pub async fn validate_coupon(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(body): Json<ValidateCouponRequest>,
) -> Result<Response, AppError> {
    let quote = state
        .reservations
        .validate_coupon(event_id, &body.code, body.amount_cents)
        .await?;
    let message = if quote.valid {
        "Coupon applied"
    } else {
        "Coupon not applicable"
    };
    Ok(success(quote, message).into_response())
}

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub guest_count: i32,
    pub coupon_code: Option<String>,
}

pub async fn create_reservation(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(body): Json<CreateReservationRequest>,
) -> Result<Response, AppError> {
    let outcome = state
        .reservations
        .create(
            event_id,
            body.user_id,
            body.guest_count,
            body.coupon_code.as_deref(),
        )
        .await?;
    Ok(created(outcome, "Reservation confirmed").into_response())
}

#[derive(Deserialize)]
pub struct CancelReservationRequest {
    pub user_id: Uuid,
}

pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(body): Json<CancelReservationRequest>,
) -> Result<Response, AppError> {
    let reservation = state
        .reservations
        .cancel(reservation_id, Some(body.user_id))
        .await?;
    Ok(success(reservation, "Reservation canceled").into_response())
}

/// Admin surface: cancels on the user's behalf with no ownership check.
/// Routed under `/admin` like membership repair, never reachable with a
/// flag in the request body.
pub async fn admin_cancel_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let reservation = state.reservations.cancel(reservation_id, None).await?;
    Ok(success(reservation, "Reservation canceled").into_response())
}
