use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn get_user_tier(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let tier = state.tiers.resolve(user_id).await?;
    Ok(success(tier, "Tier resolved").into_response())
}

#[derive(Deserialize)]
pub struct CheckoutCompletedRequest {
    pub user_id: Uuid,
    pub session_id: String,
}

/// Shared by the provider webhook and the synchronous post-checkout
/// callback; both carry the same session reference and funnel into the
/// same reconciliation primitive.
pub async fn checkout_completed(
    State(state): State<AppState>,
    Json(body): Json<CheckoutCompletedRequest>,
) -> Result<Response, AppError> {
    let membership = state
        .reconciler
        .reconcile_checkout(body.user_id, &body.session_id)
        .await?;
    Ok(success(membership, "Membership reconciled").into_response())
}

pub async fn repair_membership(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let membership = state.reconciler.repair(user_id).await?;
    Ok(success(membership, "Membership repaired").into_response())
}
