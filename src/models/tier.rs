use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Slug and level of the tier every user falls back to without an
/// active membership.
pub const FREE_TIER_SLUG: &str = "free";
pub const FREE_TIER_LEVEL: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MembershipTier {
    pub id: Uuid,
    pub slug: String,
    pub level: i32,
    pub stripe_price_id: Option<String>,
    pub discord_role_id: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The effective tier of a user after resolution: either their active
/// membership's tier or the free default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveTier {
    pub slug: String,
    pub level: i32,
}

impl EffectiveTier {
    pub fn free() -> Self {
        Self {
            slug: FREE_TIER_SLUG.to_string(),
            level: FREE_TIER_LEVEL,
        }
    }
}

/// Slug comparison tolerant of hyphen/underscore drift between the store
/// and the billing provider ("pro-plus" matches "pro_plus").
pub fn normalize_slug(slug: &str) -> String {
    slug.trim().to_ascii_lowercase().replace('-', "_")
}
