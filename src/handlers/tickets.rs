use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Deserialize)]
pub struct IssueTicketsRequest {
    pub purchase_id: Uuid,
    pub seat_count: u32,
}

/// Issues the tickets synchronously, then hands image rendering to a
/// background task: the purchaser never waits on the renderer or the
/// blob store.
pub async fn issue_tickets(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(body): Json<IssueTicketsRequest>,
) -> Result<Response, AppError> {
    let tickets = state
        .tickets
        .issue(event_id, body.purchase_id, body.seat_count)
        .await?;

    tokio::spawn(state.tickets.clone().render_pending(event_id));

    Ok(created(tickets, "Tickets issued").into_response())
}

pub async fn regenerate_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket = state.tickets.regenerate_ticket(ticket_id).await?;
    Ok(success(ticket, "Ticket image regenerated").into_response())
}

pub async fn regenerate_event_tickets(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let report = state.tickets.regenerate_event(event_id).await?;
    Ok(success(report, "Regeneration pass completed").into_response())
}

pub async fn ticket_qr(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let bytes = state.tickets.qr_png(ticket_id).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}
