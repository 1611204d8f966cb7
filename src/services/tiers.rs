//! Tier resolution and content gating. Both are reads with no side
//! effects; every authorization check re-resolves from the store rather
//! than consulting any cached tier.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::EffectiveTier;
use crate::store::EntitlementStore;
use crate::utils::error::AppError;

pub struct TierService {
    store: Arc<dyn EntitlementStore>,
}

impl TierService {
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    /// The tier of the user's single active membership, or the free
    /// default when none exists. An active membership pointing at a tier
    /// that no longer exists is a configuration error: it resolves to
    /// free with a warning instead of blocking the caller.
    pub async fn resolve(&self, user_id: Uuid) -> Result<EffectiveTier, AppError> {
        let membership = match self.store.find_active_membership(user_id).await? {
            Some(membership) => membership,
            None => return Ok(EffectiveTier::free()),
        };

        match self.store.find_tier(membership.tier_id).await? {
            Some(tier) => Ok(EffectiveTier {
                slug: tier.slug,
                level: tier.level,
            }),
            None => {
                tracing::warn!(
                    user_id = %user_id,
                    tier_id = %membership.tier_id,
                    "Active membership references a missing tier, resolving to free"
                );
                Ok(EffectiveTier::free())
            }
        }
    }
}

/// Gate decision for tier-restricted content. The first-episode flag is a
/// free-preview override and always grants.
pub fn can_access(user_level: i32, required_level: i32, first_episode: bool) -> bool {
    first_episode || user_level >= required_level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_tier_is_required() {
        assert!(!can_access(1, 2, false));
        assert!(can_access(2, 2, false));
        assert!(can_access(3, 2, false));
    }

    #[test]
    fn first_episode_overrides_tier() {
        assert!(can_access(1, 2, true));
        assert!(can_access(1, 99, true));
    }
}
