use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    content::authorize_content,
    events::{admin_cancel_reservation, cancel_reservation, create_reservation, validate_coupon},
    health_check,
    membership::{checkout_completed, get_user_tier, repair_membership},
    tickets::{issue_tickets, regenerate_event_tickets, regenerate_ticket, ticket_qr},
};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/users/:user_id/tier", get(get_user_tier))
        .route("/memberships/checkout", post(checkout_completed))
        .route("/admin/memberships/:user_id/repair", post(repair_membership))
        .route("/content/authorize", post(authorize_content))
        .route("/events/:event_id/coupons/validate", post(validate_coupon))
        .route("/events/:event_id/reservations", post(create_reservation))
        .route("/reservations/:reservation_id", delete(cancel_reservation))
        .route(
            "/admin/reservations/:reservation_id",
            delete(admin_cancel_reservation),
        )
        .route("/events/:event_id/tickets", post(issue_tickets))
        .route(
            "/events/:event_id/tickets/regenerate",
            post(regenerate_event_tickets),
        )
        .route("/tickets/:ticket_id/regenerate", post(regenerate_ticket))
        .route("/tickets/:ticket_id/qr.png", get(ticket_qr))
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
