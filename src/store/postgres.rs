//! Production store backed by PostgreSQL. Atomicity comes from the schema:
//! a partial unique index keeps memberships to one active row per user, the
//! event row is locked for the capacity check, and `(purchase_id, seat)`
//! deduplicates ticket issuance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Event, EventCoupon, EventTicket, MembershipTier, Reservation, User, UserMembership,
};
use crate::store::{EntitlementStore, MembershipUpsert, NewTicket, StoreError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[async_trait]
impl EntitlementStore for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_tier(&self, id: Uuid) -> Result<Option<MembershipTier>, StoreError> {
        let tier = sqlx::query_as::<_, MembershipTier>(
            "SELECT * FROM membership_tiers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tier)
    }

    async fn find_tier_by_price(
        &self,
        price_id: &str,
    ) -> Result<Option<MembershipTier>, StoreError> {
        let tier = sqlx::query_as::<_, MembershipTier>(
            "SELECT * FROM membership_tiers WHERE stripe_price_id = $1 AND active",
        )
        .bind(price_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tier)
    }

    async fn find_tier_by_slug(&self, slug: &str) -> Result<Option<MembershipTier>, StoreError> {
        // Normalized on both sides: hyphen and underscore are equivalent.
        let tier = sqlx::query_as::<_, MembershipTier>(
            "SELECT * FROM membership_tiers \
             WHERE replace(lower(slug), '-', '_') = $1 AND active",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tier)
    }

    async fn find_active_membership(
        &self,
        user_id: Uuid,
    ) -> Result<Option<UserMembership>, StoreError> {
        let membership = sqlx::query_as::<_, UserMembership>(
            "SELECT * FROM user_memberships WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    async fn upsert_active_membership(
        &self,
        change: MembershipUpsert,
    ) -> Result<UserMembership, StoreError> {
        // Two passes at most: if our insert loses the race against another
        // trigger path, the unique index reports it and the second pass
        // finds the winner's row and updates it instead.
        for attempt in 0..2 {
            let mut tx = self.pool.begin().await?;

            let existing = sqlx::query_as::<_, UserMembership>(
                "SELECT * FROM user_memberships \
                 WHERE user_id = $1 AND status = 'active' FOR UPDATE",
            )
            .bind(change.user_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(current) = existing {
                // External ids are fill-only; current_period_start is left
                // alone after initial activation.
                let updated = sqlx::query_as::<_, UserMembership>(
                    "UPDATE user_memberships SET \
                        tier_id = $2, \
                        stripe_subscription_id = COALESCE(stripe_subscription_id, $3), \
                        stripe_customer_id = COALESCE(stripe_customer_id, $4), \
                        updated_at = now() \
                     WHERE id = $1 \
                     RETURNING *",
                )
                .bind(current.id)
                .bind(change.tier_id)
                .bind(change.stripe_subscription_id.as_deref())
                .bind(change.stripe_customer_id.as_deref())
                .fetch_one(&mut *tx)
                .await?;
                tx.commit().await?;
                return Ok(updated);
            }

            let inserted = sqlx::query_as::<_, UserMembership>(
                "INSERT INTO user_memberships \
                    (user_id, tier_id, status, stripe_subscription_id, \
                     stripe_customer_id, current_period_start) \
                 VALUES ($1, $2, 'active', $3, $4, $5) \
                 RETURNING *",
            )
            .bind(change.user_id)
            .bind(change.tier_id)
            .bind(change.stripe_subscription_id.as_deref())
            .bind(change.stripe_customer_id.as_deref())
            .bind(change.period_start)
            .fetch_one(&mut *tx)
            .await;

            match inserted {
                Ok(row) => {
                    tx.commit().await?;
                    return Ok(row);
                }
                Err(e) if is_unique_violation(&e) => {
                    tx.rollback().await.ok();
                    if attempt == 0 {
                        tracing::debug!(
                            user_id = %change.user_id,
                            "Concurrent membership create detected, retrying as update"
                        );
                        continue;
                    }
                    return Err(StoreError::Conflict);
                }
                Err(e) => return Err(e.into()),
            }
        }
        unreachable!("membership upsert retries exhausted")
    }

    async fn record_role_sync(
        &self,
        membership_id: Uuid,
        assigned: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE user_memberships SET \
                discord_role_assigned = $2, last_synced_at = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(membership_id)
        .bind(assigned)
        .bind(at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn find_coupon(
        &self,
        event_id: Uuid,
        code: &str,
    ) -> Result<Option<EventCoupon>, StoreError> {
        let coupon = sqlx::query_as::<_, EventCoupon>(
            "SELECT * FROM event_coupons WHERE event_id = $1 AND code = $2",
        )
        .bind(event_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(coupon)
    }

    async fn redeem_coupon(&self, coupon_id: Uuid) -> Result<bool, StoreError> {
        // The usage check rides inside the UPDATE's WHERE clause, so the
        // row lock makes check and increment one atomic step. Zero rows
        // affected means the limit was already reached.
        let result = sqlx::query(
            "UPDATE event_coupons SET used_count = used_count + 1 \
             WHERE id = $1 AND (max_uses IS NULL OR used_count < max_uses)",
        )
        .bind(coupon_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_reservation_checked(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        guest_count: i32,
    ) -> Result<Reservation, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Locking the event row serializes concurrent reservers for the
        // same event; the seat sum below is then consistent.
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound)?;

        if let Some(capacity) = event.capacity {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(1 + guest_count), 0) FROM reservations \
                 WHERE event_id = $1 AND status = 'confirmed'",
            )
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;

            if taken + 1 + guest_count as i64 > capacity as i64 {
                tx.rollback().await.ok();
                return Err(StoreError::CapacityExceeded);
            }
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (event_id, user_id, guest_count, status) \
             VALUES ($1, $2, $3, 'confirmed') \
             RETURNING *",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(guest_count)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reservation)
    }

    async fn find_reservation(&self, id: Uuid) -> Result<Option<Reservation>, StoreError> {
        let reservation =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(reservation)
    }

    async fn cancel_reservation(&self, id: Uuid) -> Result<Reservation, StoreError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'canceled', updated_at = now() \
             WHERE id = $1 \
             RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Ok(reservation)
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> Result<EventTicket, StoreError> {
        let inserted = sqlx::query_as::<_, EventTicket>(
            "INSERT INTO event_tickets (event_id, purchase_id, seat, qr_code_data) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (purchase_id, seat) DO NOTHING \
             RETURNING *",
        )
        .bind(ticket.event_id)
        .bind(ticket.purchase_id)
        .bind(ticket.seat)
        .bind(&ticket.qr_code_data)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(row) => Ok(row),
            // Already issued by an earlier call; hand back the original so
            // its qr_code_data is never replaced.
            None => {
                let existing = sqlx::query_as::<_, EventTicket>(
                    "SELECT * FROM event_tickets WHERE purchase_id = $1 AND seat = $2",
                )
                .bind(ticket.purchase_id)
                .bind(ticket.seat)
                .fetch_one(&self.pool)
                .await?;
                Ok(existing)
            }
        }
    }

    async fn find_ticket(&self, id: Uuid) -> Result<Option<EventTicket>, StoreError> {
        let ticket = sqlx::query_as::<_, EventTicket>("SELECT * FROM event_tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn set_ticket_image_url(&self, ticket_id: Uuid, url: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE event_tickets SET ticket_image_url = $2, updated_at = now() WHERE id = $1",
        )
        .bind(ticket_id)
        .bind(url)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn tickets_missing_image(&self, event_id: Uuid) -> Result<Vec<EventTicket>, StoreError> {
        let tickets = sqlx::query_as::<_, EventTicket>(
            "SELECT * FROM event_tickets \
             WHERE event_id = $1 AND ticket_image_url IS NULL \
             ORDER BY created_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tickets)
    }
}
