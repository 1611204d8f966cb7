pub mod coupon;
pub mod event;
pub mod membership;
pub mod reservation;
pub mod ticket;
pub mod tier;
pub mod user;

pub use coupon::{CouponKind, EventCoupon};
pub use event::{Event, EventStatus};
pub use membership::{MembershipStatus, UserMembership};
pub use reservation::{Reservation, ReservationStatus};
pub use ticket::EventTicket;
pub use tier::{normalize_slug, EffectiveTier, MembershipTier};
pub use user::User;
