pub mod reconcile;
pub mod reservations;
pub mod tickets;
pub mod tiers;

pub use reconcile::MembershipReconciler;
pub use reservations::{CouponQuote, ReservationOutcome, ReservationService};
pub use tickets::{RegenerationReport, TicketIssuer};
pub use tiers::{can_access, TierService};
