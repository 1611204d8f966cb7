//! Capacity-bounded reservations and coupon pricing. The capacity check
//! itself lives in the store (check-then-insert as one atomic unit); this
//! layer owns validation, pricing, and ownership rules.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Event, Reservation};
use crate::store::{EntitlementStore, StoreError};
use crate::utils::error::AppError;

/// Outcome of applying a coupon code. An unknown, expired, or used-up
/// code is not an error: the caller gets the original amount back with
/// `valid = false` and can tell "no discount" from a system failure.
#[derive(Debug, Clone, Serialize)]
pub struct CouponQuote {
    pub amount_cents: i64,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_id: Option<Uuid>,
}

impl CouponQuote {
    fn unchanged(amount_cents: i64) -> Self {
        Self {
            amount_cents,
            valid: false,
            coupon_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationOutcome {
    pub reservation: Reservation,
    pub price_cents: i64,
    pub coupon_applied: bool,
}

pub struct ReservationService {
    store: Arc<dyn EntitlementStore>,
}

impl ReservationService {
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self { store }
    }

    /// Case-sensitive code lookup scoped to the event, then the discount
    /// arithmetic from the coupon model. Read-only.
    pub async fn validate_coupon(
        &self,
        event_id: Uuid,
        code: &str,
        amount_cents: i64,
    ) -> Result<CouponQuote, AppError> {
        let coupon = match self.store.find_coupon(event_id, code).await? {
            Some(coupon) => coupon,
            None => return Ok(CouponQuote::unchanged(amount_cents)),
        };

        if !coupon.is_redeemable(Utc::now()) {
            return Ok(CouponQuote::unchanged(amount_cents));
        }

        Ok(CouponQuote {
            amount_cents: coupon.apply(amount_cents),
            valid: true,
            coupon_id: Some(coupon.id),
        })
    }

    /// Creates a confirmed reservation, atomically checked against the
    /// event's capacity. An optional coupon is priced against the event's
    /// minimum price for the requested seats; the quote is advisory, and
    /// the discount holds only if spending a use succeeds once the
    /// reservation has committed. A coupon whose uses ran out between the
    /// quote and the redemption falls back to full price.
    pub async fn create(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        guest_count: i32,
        coupon_code: Option<&str>,
    ) -> Result<ReservationOutcome, AppError> {
        if guest_count < 0 {
            return Err(AppError::ValidationError(
                "Guest count cannot be negative".to_string(),
            ));
        }

        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {event_id} was not found")))?;

        let seats = 1 + guest_count as i64;
        let base_price = event.min_price_cents * seats;

        let quote = match coupon_code {
            Some(code) => self.validate_coupon(event_id, code, base_price).await?,
            None => CouponQuote::unchanged(base_price),
        };

        let reservation = self
            .store
            .insert_reservation_checked(event_id, user_id, guest_count)
            .await
            .map_err(|e| match e {
                StoreError::NotFound => {
                    AppError::NotFound(format!("Event {event_id} was not found"))
                }
                StoreError::CapacityExceeded => AppError::CapacityExceeded(capacity_message(&event)),
                other => other.into(),
            })?;

        let (price_cents, coupon_applied) = match quote.coupon_id {
            Some(coupon_id) => match self.store.redeem_coupon(coupon_id).await {
                Ok(true) => (quote.amount_cents, true),
                Ok(false) => {
                    tracing::info!(
                        coupon_id = %coupon_id,
                        "Coupon uses exhausted before redemption, charging full price"
                    );
                    (base_price, false)
                }
                // No discount without a recorded redemption.
                Err(e) => {
                    tracing::warn!(coupon_id = %coupon_id, error = %e, "Coupon redemption failed, charging full price");
                    (base_price, false)
                }
            },
            None => (base_price, false),
        };

        Ok(ReservationOutcome {
            reservation,
            price_cents,
            coupon_applied,
        })
    }

    /// Only the owner or an administrator may cancel. `requester` is
    /// `None` when the call arrives through the trusted admin surface; a
    /// caller-supplied id must match the owner. Canceling frees the seats
    /// for the next capacity check immediately; there is no separate
    /// counter to fall out of sync.
    pub async fn cancel(
        &self,
        reservation_id: Uuid,
        requester: Option<Uuid>,
    ) -> Result<Reservation, AppError> {
        let reservation = self
            .store
            .find_reservation(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Reservation {reservation_id} was not found"))
            })?;

        if let Some(requester_id) = requester {
            if reservation.user_id != requester_id {
                return Err(AppError::Forbidden(
                    "Only the reservation owner may cancel it".to_string(),
                ));
            }
        }

        let canceled = self.store.cancel_reservation(reservation_id).await?;
        Ok(canceled)
    }
}

fn capacity_message(event: &Event) -> String {
    format!("Event \"{}\" has no remaining capacity", event.title)
}
