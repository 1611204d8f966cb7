//! Subscription reconciliation: one idempotent primitive that the
//! webhook, the synchronous post-checkout callback, and the admin repair
//! tool all funnel into. The billing provider is the source of truth; the
//! membership row converges toward it regardless of call order or
//! duplication.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::clients::{BillingProvider, ChatRoleClient};
use crate::models::{normalize_slug, MembershipTier, UserMembership};
use crate::store::{EntitlementStore, MembershipUpsert};
use crate::utils::error::AppError;

pub struct MembershipReconciler {
    store: Arc<dyn EntitlementStore>,
    billing: Arc<dyn BillingProvider>,
    chat: Arc<dyn ChatRoleClient>,
}

impl MembershipReconciler {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        billing: Arc<dyn BillingProvider>,
        chat: Arc<dyn ChatRoleClient>,
    ) -> Self {
        Self {
            store,
            billing,
            chat,
        }
    }

    /// Checkout-completion entry point, shared by the provider webhook and
    /// the synchronous callback. Aborts with no write unless the session's
    /// payment is confirmed complete.
    pub async fn reconcile_checkout(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<UserMembership, AppError> {
        let session = self
            .billing
            .retrieve_checkout_session(session_id)
            .await
            .map_err(AppError::from)?;

        if !session.is_paid() {
            return Err(AppError::ValidationError(format!(
                "Checkout session {session_id} has not completed payment"
            )));
        }

        let tier = self
            .resolve_tier_from_metadata(&session.metadata, session.subscription_id.as_deref())
            .await?;

        let customer_id = match session.customer_id.clone() {
            Some(id) => Some(id),
            None => self.backfill_customer(user_id).await,
        };

        self.apply(user_id, &tier, session.subscription_id, customer_id)
            .await
    }

    /// Administrator repair: re-fetch the stored subscription from the
    /// provider and correct any tier drift.
    pub async fn repair(&self, user_id: Uuid) -> Result<UserMembership, AppError> {
        let membership = self
            .store
            .find_active_membership(user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("User {user_id} has no active membership"))
            })?;

        let subscription_id = membership.stripe_subscription_id.clone().ok_or_else(|| {
            AppError::ValidationError(format!(
                "Membership {} holds no subscription reference to repair from",
                membership.id
            ))
        })?;

        let subscription = self
            .billing
            .retrieve_subscription(&subscription_id)
            .await
            .map_err(AppError::from)?;

        let price_id = subscription.price_id.as_deref().ok_or_else(|| {
            AppError::UpstreamUnavailable(format!(
                "Subscription {subscription_id} carries no price reference"
            ))
        })?;

        let tier = self.resolve_tier(Some(price_id), None).await?;

        if tier.id != membership.tier_id {
            tracing::info!(
                user_id = %user_id,
                stored_tier = %membership.tier_id,
                resolved_tier = %tier.id,
                "Repair corrected tier drift against the billing provider"
            );
        }

        self.apply(
            user_id,
            &tier,
            Some(subscription_id),
            membership.stripe_customer_id.clone(),
        )
        .await
    }

    /// The single reconciliation write. Upserts against the
    /// one-active-row invariant, then attempts the best-effort role sync;
    /// sync failure is recorded on the row, never propagated.
    async fn apply(
        &self,
        user_id: Uuid,
        tier: &MembershipTier,
        subscription_id: Option<String>,
        customer_id: Option<String>,
    ) -> Result<UserMembership, AppError> {
        let membership = self
            .store
            .upsert_active_membership(MembershipUpsert {
                user_id,
                tier_id: tier.id,
                stripe_subscription_id: subscription_id,
                stripe_customer_id: customer_id,
                period_start: Utc::now(),
            })
            .await?;

        tracing::info!(
            user_id = %user_id,
            tier = %tier.slug,
            membership_id = %membership.id,
            "Membership reconciled"
        );

        self.sync_chat_role(&membership, tier).await;

        // Hand back the row including the recorded sync outcome.
        Ok(self
            .store
            .find_active_membership(user_id)
            .await?
            .unwrap_or(membership))
    }

    /// Tier lookup precedence: exact external price reference first, then
    /// slug with hyphen/underscore normalization. An unresolvable tier
    /// fails loudly so a paying user is never silently downgraded.
    async fn resolve_tier(
        &self,
        price_id: Option<&str>,
        slug: Option<&str>,
    ) -> Result<MembershipTier, AppError> {
        if let Some(price_id) = price_id {
            if let Some(tier) = self.store.find_tier_by_price(price_id).await? {
                return Ok(tier);
            }
        }
        if let Some(slug) = slug {
            if let Some(tier) = self.store.find_tier_by_slug(&normalize_slug(slug)).await? {
                return Ok(tier);
            }
        }
        Err(AppError::NotFound(format!(
            "No membership tier matches price {:?} or slug {:?}",
            price_id, slug
        )))
    }

    async fn resolve_tier_from_metadata(
        &self,
        metadata: &std::collections::HashMap<String, String>,
        subscription_id: Option<&str>,
    ) -> Result<MembershipTier, AppError> {
        // Sessions created by our checkout flow carry the tier id directly.
        if let Some(tier) = metadata
            .get("tier_id")
            .and_then(|raw| Uuid::parse_str(raw).ok())
        {
            if let Some(tier) = self.store.find_tier(tier).await? {
                return Ok(tier);
            }
        }

        // Otherwise fall back to the subscription's price and the slug
        // hint, in that order.
        let price_id = match subscription_id {
            Some(id) => self
                .billing
                .retrieve_subscription(id)
                .await
                .map_err(AppError::from)?
                .price_id,
            None => None,
        };
        self.resolve_tier(price_id.as_deref(), metadata.get("tier").map(String::as_str))
            .await
    }

    /// Looks up or creates the provider customer from the user's email
    /// when the session did not carry one. Best-effort: the membership
    /// write must not fail over a missing customer reference, which the
    /// repair path can fill later.
    async fn backfill_customer(&self, user_id: Uuid) -> Option<String> {
        let user = match self.store.find_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Customer backfill skipped");
                return None;
            }
        };

        let found = self.billing.find_customer_by_email(&user.email).await;
        match found {
            Ok(Some(customer)) => Some(customer.id),
            Ok(None) => match self.billing.create_customer(&user.email).await {
                Ok(customer) => Some(customer.id),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Customer create failed");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Customer lookup failed");
                None
            }
        }
    }

    /// Fire-and-forget relative to the entitlement write: the outcome is
    /// recorded on the membership for later manual repair, and no failure
    /// here rolls back or fails the reconciliation.
    async fn sync_chat_role(&self, membership: &UserMembership, tier: &MembershipTier) {
        let role_id = match tier.discord_role_id.as_deref() {
            Some(role_id) => role_id,
            None => return,
        };

        let discord_user_id = match self.store.find_user(membership.user_id).await {
            Ok(Some(user)) => user.discord_user_id,
            _ => None,
        };
        let discord_user_id = match discord_user_id {
            Some(id) => id,
            None => {
                tracing::debug!(
                    user_id = %membership.user_id,
                    "No chat identity on file, skipping role sync"
                );
                return;
            }
        };

        let assigned = match self.chat.assign_role(&discord_user_id, role_id).await {
            Ok(assigned) => assigned,
            Err(e) => {
                tracing::warn!(
                    user_id = %membership.user_id,
                    role = %role_id,
                    error = %e,
                    "Chat role sync failed"
                );
                false
            }
        };

        if let Err(e) = self
            .store
            .record_role_sync(membership.id, assigned, Utc::now())
            .await
        {
            tracing::warn!(
                membership_id = %membership.id,
                error = %e,
                "Could not record role sync outcome"
            );
        }
    }
}
