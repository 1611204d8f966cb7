//! The entitlement store: every invariant-bearing write goes through this
//! trait so the engine stays agnostic of the backing database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Event, EventCoupon, EventTicket, MembershipTier, Reservation, User, UserMembership,
};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,

    /// The reservation would push the event past its capacity.
    #[error("capacity exceeded")]
    CapacityExceeded,

    /// A concurrent writer beat us and the retry could not absorb it.
    #[error("concurrent duplicate write")]
    Conflict,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("Resource not found".to_string()),
            StoreError::CapacityExceeded => {
                AppError::CapacityExceeded("The event has no remaining capacity".to_string())
            }
            StoreError::Conflict => {
                AppError::Conflict("A concurrent write already created this row".to_string())
            }
            StoreError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

/// Fields the reconciler is allowed to write on a membership. External ids
/// are fill-only: the store never overwrites a populated id with null.
#[derive(Debug, Clone)]
pub struct MembershipUpsert {
    pub user_id: Uuid,
    pub tier_id: Uuid,
    pub stripe_subscription_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    /// Used only when the upsert creates the row (initial activation).
    pub period_start: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub event_id: Uuid,
    pub purchase_id: Uuid,
    pub seat: i32,
    pub qr_code_data: String,
}

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_tier(&self, id: Uuid) -> Result<Option<MembershipTier>, StoreError>;
    async fn find_tier_by_price(&self, price_id: &str)
        -> Result<Option<MembershipTier>, StoreError>;
    /// Lookup by slug already normalized with [`crate::models::normalize_slug`].
    async fn find_tier_by_slug(&self, slug: &str) -> Result<Option<MembershipTier>, StoreError>;

    async fn find_active_membership(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserMembership>, StoreError>;

    /// Idempotent upsert against the one-active-membership-per-user
    /// invariant. A concurrent create by another trigger path is absorbed:
    /// the losing writer re-reads and updates instead of duplicating.
    async fn upsert_active_membership(
        &self,
        change: MembershipUpsert,
    ) -> Result<UserMembership, StoreError>;

    /// Records the outcome of the best-effort chat-role sync.
    async fn record_role_sync(
        &self,
        membership_id: Uuid,
        assigned: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    /// Exact, case-sensitive code lookup scoped to the event.
    async fn find_coupon(
        &self,
        event_id: Uuid,
        code: &str,
    ) -> Result<Option<EventCoupon>, StoreError>;

    /// Spends one use of the coupon, atomically checked against
    /// `max_uses`. Returns `false` when the limit is already reached (or
    /// the coupon is gone), so concurrent redeemers can never jointly push
    /// `used_count` past the limit.
    async fn redeem_coupon(&self, coupon_id: Uuid) -> Result<bool, StoreError>;

    /// Capacity check and insert as one atomic unit: two concurrent calls
    /// for the same event can never jointly overshoot its capacity.
    async fn insert_reservation_checked(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        guest_count: i32,
    ) -> Result<Reservation, StoreError>;

    async fn find_reservation(&self, id: Uuid) -> Result<Option<Reservation>, StoreError>;

    /// Marks the reservation canceled, which frees its seats for the next
    /// capacity check.
    async fn cancel_reservation(&self, id: Uuid) -> Result<Reservation, StoreError>;

    /// Idempotent on `(purchase_id, seat)`: a duplicate insert returns the
    /// already-issued ticket untouched.
    async fn insert_ticket(&self, ticket: NewTicket) -> Result<EventTicket, StoreError>;

    async fn find_ticket(&self, id: Uuid) -> Result<Option<EventTicket>, StoreError>;

    async fn set_ticket_image_url(&self, ticket_id: Uuid, url: &str) -> Result<(), StoreError>;

    /// Tickets of the event still awaiting their rendered image.
    async fn tickets_missing_image(&self, event_id: Uuid) -> Result<Vec<EventTicket>, StoreError>;
}
