//! In-memory store used by the integration tests and for local development
//! without a database. A single async mutex makes every trait call atomic,
//! which is exactly the consistency the Postgres schema provides.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    normalize_slug, Event, EventCoupon, EventTicket, MembershipStatus, MembershipTier, Reservation,
    ReservationStatus, User, UserMembership,
};
use crate::store::{EntitlementStore, MembershipUpsert, NewTicket, StoreError};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    tiers: HashMap<Uuid, MembershipTier>,
    memberships: HashMap<Uuid, UserMembership>,
    events: HashMap<Uuid, Event>,
    coupons: HashMap<Uuid, EventCoupon>,
    reservations: HashMap<Uuid, Reservation>,
    tickets: HashMap<Uuid, EventTicket>,
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.inner.lock().await.users.insert(user.id, user);
    }

    pub async fn add_tier(&self, tier: MembershipTier) {
        self.inner.lock().await.tiers.insert(tier.id, tier);
    }

    pub async fn add_event(&self, event: Event) {
        self.inner.lock().await.events.insert(event.id, event);
    }

    pub async fn add_coupon(&self, coupon: EventCoupon) {
        self.inner.lock().await.coupons.insert(coupon.id, coupon);
    }

    /// Test hook: drops the tier row while leaving memberships that
    /// reference it, to simulate a dangling tier reference.
    pub async fn remove_tier(&self, tier_id: Uuid) {
        self.inner.lock().await.tiers.remove(&tier_id);
    }

    pub async fn membership(&self, id: Uuid) -> Option<UserMembership> {
        self.inner.lock().await.memberships.get(&id).cloned()
    }

    pub async fn memberships_for_user(&self, user_id: Uuid) -> Vec<UserMembership> {
        self.inner
            .lock()
            .await
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn confirmed_seats(&self, event_id: Uuid) -> i64 {
        confirmed_seats(&self.inner.lock().await.reservations, event_id)
    }
}

fn confirmed_seats(reservations: &HashMap<Uuid, Reservation>, event_id: Uuid) -> i64 {
    reservations
        .values()
        .filter(|r| r.event_id == event_id && r.status == ReservationStatus::Confirmed)
        .map(Reservation::seats)
        .sum()
}

#[async_trait]
impl EntitlementStore for MemStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn find_tier(&self, id: Uuid) -> Result<Option<MembershipTier>, StoreError> {
        Ok(self.inner.lock().await.tiers.get(&id).cloned())
    }

    async fn find_tier_by_price(
        &self,
        price_id: &str,
    ) -> Result<Option<MembershipTier>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .tiers
            .values()
            .find(|t| t.active && t.stripe_price_id.as_deref() == Some(price_id))
            .cloned())
    }

    async fn find_tier_by_slug(&self, slug: &str) -> Result<Option<MembershipTier>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .tiers
            .values()
            .find(|t| t.active && normalize_slug(&t.slug) == slug)
            .cloned())
    }

    async fn find_active_membership(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserMembership>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .memberships
            .values()
            .find(|m| m.user_id == user_id && m.status == MembershipStatus::Active)
            .cloned())
    }

    async fn upsert_active_membership(
        &self,
        change: MembershipUpsert,
    ) -> Result<UserMembership, StoreError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();

        let existing_id = inner
            .memberships
            .values()
            .find(|m| m.user_id == change.user_id && m.status == MembershipStatus::Active)
            .map(|m| m.id);

        if let Some(id) = existing_id {
            let row = inner.memberships.get_mut(&id).expect("row exists");
            row.tier_id = change.tier_id;
            if row.stripe_subscription_id.is_none() {
                row.stripe_subscription_id = change.stripe_subscription_id.clone();
            }
            if row.stripe_customer_id.is_none() {
                row.stripe_customer_id = change.stripe_customer_id.clone();
            }
            row.updated_at = now;
            return Ok(row.clone());
        }

        let row = UserMembership {
            id: Uuid::new_v4(),
            user_id: change.user_id,
            tier_id: change.tier_id,
            status: MembershipStatus::Active,
            stripe_subscription_id: change.stripe_subscription_id,
            stripe_customer_id: change.stripe_customer_id,
            current_period_start: Some(change.period_start),
            discord_role_assigned: false,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.memberships.insert(row.id, row.clone());
        Ok(row)
    }

    async fn record_role_sync(
        &self,
        membership_id: Uuid,
        assigned: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .memberships
            .get_mut(&membership_id)
            .ok_or(StoreError::NotFound)?;
        row.discord_role_assigned = assigned;
        row.last_synced_at = Some(at);
        row.updated_at = at;
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.inner.lock().await.events.get(&id).cloned())
    }

    async fn find_coupon(
        &self,
        event_id: Uuid,
        code: &str,
    ) -> Result<Option<EventCoupon>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .coupons
            .values()
            .find(|c| c.event_id == event_id && c.code == code)
            .cloned())
    }

    async fn redeem_coupon(&self, coupon_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let coupon = match inner.coupons.get_mut(&coupon_id) {
            Some(coupon) => coupon,
            None => return Ok(false),
        };
        if coupon.max_uses.is_some_and(|max| coupon.used_count >= max) {
            return Ok(false);
        }
        coupon.used_count += 1;
        Ok(true)
    }

    async fn insert_reservation_checked(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        guest_count: i32,
    ) -> Result<Reservation, StoreError> {
        let mut inner = self.inner.lock().await;

        let capacity = inner
            .events
            .get(&event_id)
            .ok_or(StoreError::NotFound)?
            .capacity;

        if let Some(capacity) = capacity {
            let taken = confirmed_seats(&inner.reservations, event_id);
            if taken + 1 + guest_count as i64 > capacity as i64 {
                return Err(StoreError::CapacityExceeded);
            }
        }

        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            guest_count,
            status: ReservationStatus::Confirmed,
            created_at: now,
            updated_at: now,
        };
        inner.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn find_reservation(&self, id: Uuid) -> Result<Option<Reservation>, StoreError> {
        Ok(self.inner.lock().await.reservations.get(&id).cloned())
    }

    async fn cancel_reservation(&self, id: Uuid) -> Result<Reservation, StoreError> {
        let mut inner = self.inner.lock().await;
        let row = inner.reservations.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.status = ReservationStatus::Canceled;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> Result<EventTicket, StoreError> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner
            .tickets
            .values()
            .find(|t| t.purchase_id == ticket.purchase_id && t.seat == ticket.seat)
        {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let row = EventTicket {
            id: Uuid::new_v4(),
            event_id: ticket.event_id,
            purchase_id: ticket.purchase_id,
            seat: ticket.seat,
            qr_code_data: ticket.qr_code_data,
            ticket_image_url: None,
            created_at: now,
            updated_at: now,
        };
        inner.tickets.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_ticket(&self, id: Uuid) -> Result<Option<EventTicket>, StoreError> {
        Ok(self.inner.lock().await.tickets.get(&id).cloned())
    }

    async fn set_ticket_image_url(&self, ticket_id: Uuid, url: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let ticket = inner.tickets.get_mut(&ticket_id).ok_or(StoreError::NotFound)?;
        ticket.ticket_image_url = Some(url.to_string());
        ticket.updated_at = Utc::now();
        Ok(())
    }

    async fn tickets_missing_image(&self, event_id: Uuid) -> Result<Vec<EventTicket>, StoreError> {
        let mut tickets: Vec<EventTicket> = self
            .inner
            .lock()
            .await
            .tickets
            .values()
            .filter(|t| t.event_id == event_id && t.ticket_image_url.is_none())
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.created_at);
        Ok(tickets)
    }
}
