use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "coupon_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `value` is a percentage off (0..=100).
    Percent,
    /// `value` is an amount off in cents.
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventCoupon {
    pub id: Uuid,
    pub event_id: Uuid,
    /// Case-sensitive, unique per event.
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub created_at: DateTime<Utc>,
}

impl EventCoupon {
    /// A coupon is redeemable when it has not expired and has uses left.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        if let Some(expires_at) = self.expires_at {
            if now >= expires_at {
                return false;
            }
        }
        if let Some(max_uses) = self.max_uses {
            if self.used_count >= max_uses {
                return false;
            }
        }
        true
    }

    /// Applies the discount to `amount_cents`, clamped to zero. Percent
    /// discounts round down to the nearest cent.
    pub fn apply(&self, amount_cents: i64) -> i64 {
        let discounted = match self.kind {
            CouponKind::Percent => amount_cents * (100 - self.value.clamp(0, 100)) / 100,
            CouponKind::Fixed => amount_cents - self.value,
        };
        discounted.max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(kind: CouponKind, value: i64) -> EventCoupon {
        EventCoupon {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            code: "TEST".to_string(),
            kind,
            value,
            expires_at: None,
            max_uses: None,
            used_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percent_discount_rounds_down() {
        assert_eq!(coupon(CouponKind::Percent, 20).apply(1000), 800);
        // 15% of 999 = 849.15, floor to 849
        assert_eq!(coupon(CouponKind::Percent, 15).apply(999), 849);
    }

    #[test]
    fn fixed_discount_floors_at_zero() {
        assert_eq!(coupon(CouponKind::Fixed, 300).apply(250), 0);
        assert_eq!(coupon(CouponKind::Fixed, 300).apply(1000), 700);
    }

    #[test]
    fn expired_coupon_is_not_redeemable() {
        let mut c = coupon(CouponKind::Percent, 10);
        c.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(!c.is_redeemable(Utc::now()));
    }

    #[test]
    fn used_up_coupon_is_not_redeemable() {
        let mut c = coupon(CouponKind::Percent, 10);
        c.max_uses = Some(5);
        c.used_count = 5;
        assert!(!c.is_redeemable(Utc::now()));
    }
}
