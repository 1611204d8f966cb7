use std::sync::Arc;

use crate::services::{MembershipReconciler, ReservationService, TicketIssuer, TierService};

/// Shared handler state: the engine services, each already wired to the
/// entitlement store and the external collaborators.
#[derive(Clone)]
pub struct AppState {
    pub tiers: Arc<TierService>,
    pub reconciler: Arc<MembershipReconciler>,
    pub reservations: Arc<ReservationService>,
    pub tickets: Arc<TicketIssuer>,
}
