use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::EffectiveTier;
use crate::services::can_access;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Deserialize)]
pub struct ContentAuthRequest {
    pub user_id: Uuid,
    pub required_tier_level: i32,
    #[serde(default)]
    pub first_episode: bool,
}

#[derive(Serialize)]
pub struct ContentDecision {
    pub allowed: bool,
    pub tier: EffectiveTier,
}

/// The content gate: re-resolves the caller's tier and applies the level
/// check, with the first-episode free-preview override.
pub async fn authorize_content(
    State(state): State<AppState>,
    Json(body): Json<ContentAuthRequest>,
) -> Result<Response, AppError> {
    let tier = state.tiers.resolve(body.user_id).await?;
    let allowed = can_access(tier.level, body.required_tier_level, body.first_episode);
    Ok(success(
        ContentDecision { allowed, tier },
        "Access decision computed",
    )
    .into_response())
}
