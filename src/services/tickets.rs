//! Ticket issuance and image repair. A ticket's scannable payload is
//! written exactly once; the rendered image is a derived artifact that may
//! lag behind ("processing") and can be regenerated any number of times.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::clients::{ObjectStorage, QrRenderer};
use crate::models::{Event, EventTicket};
use crate::store::{EntitlementStore, NewTicket};
use crate::utils::error::AppError;

/// Upper bound on seats per purchase; also keeps the seat numbers well
/// inside the i32 column range.
pub const MAX_SEATS_PER_PURCHASE: u32 = 500;

#[derive(Debug, Serialize)]
pub struct RegenerationReport {
    pub regenerated_count: usize,
    pub errors: Vec<String>,
}

pub struct TicketIssuer {
    store: Arc<dyn EntitlementStore>,
    renderer: Arc<dyn QrRenderer>,
    storage: Arc<dyn ObjectStorage>,
}

impl TicketIssuer {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        renderer: Arc<dyn QrRenderer>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            store,
            renderer,
            storage,
        }
    }

    /// Issues one ticket per paid seat of the purchase, each persisted in
    /// the processing state (no image yet). Idempotent: a repeated call
    /// for the same purchase returns the already-issued tickets with their
    /// original payloads.
    pub async fn issue(
        &self,
        event_id: Uuid,
        purchase_id: Uuid,
        seat_count: u32,
    ) -> Result<Vec<EventTicket>, AppError> {
        if seat_count == 0 || seat_count > MAX_SEATS_PER_PURCHASE {
            return Err(AppError::ValidationError(format!(
                "A purchase must cover between 1 and {MAX_SEATS_PER_PURCHASE} seats"
            )));
        }

        self.store
            .find_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {event_id} was not found")))?;

        let mut tickets = Vec::with_capacity(seat_count as usize);
        for seat in 1..=seat_count as i32 {
            let ticket = self
                .store
                .insert_ticket(NewTicket {
                    event_id,
                    purchase_id,
                    seat,
                    qr_code_data: qr_payload(event_id, purchase_id, seat),
                })
                .await?;
            tickets.push(ticket);
        }

        tracing::info!(
            event_id = %event_id,
            purchase_id = %purchase_id,
            count = tickets.len(),
            "Tickets issued"
        );
        Ok(tickets)
    }

    /// Renders and stores the image for one ticket, overwriting any
    /// previous URL. The payload is never touched: regenerating a ticket
    /// that was already scanned or shared must not invalidate it.
    pub async fn regenerate_ticket(&self, ticket_id: Uuid) -> Result<EventTicket, AppError> {
        let ticket = self.require_ticket(ticket_id).await?;
        let event = self.require_event(ticket.event_id).await?;
        self.render_and_store(&ticket, &event).await?;
        self.require_ticket(ticket_id).await
    }

    /// Batch repair for an event: only tickets still missing their image
    /// are touched, each independently, so one failure neither aborts the
    /// batch nor hides the rest.
    pub async fn regenerate_event(&self, event_id: Uuid) -> Result<RegenerationReport, AppError> {
        let event = self.require_event(event_id).await?;
        let pending = self.store.tickets_missing_image(event_id).await?;

        let mut report = RegenerationReport {
            regenerated_count: 0,
            errors: Vec::new(),
        };
        for ticket in pending {
            match self.render_and_store(&ticket, &event).await {
                Ok(()) => report.regenerated_count += 1,
                Err(e) => {
                    tracing::warn!(ticket_id = %ticket.id, error = %e, "Ticket image regeneration failed");
                    report.errors.push(format!("ticket {}: {}", ticket.id, e));
                }
            }
        }
        Ok(report)
    }

    /// On-demand PNG of the ticket's QR for admin display.
    pub async fn qr_png(&self, ticket_id: Uuid) -> Result<Vec<u8>, AppError> {
        let ticket = self.require_ticket(ticket_id).await?;
        let event = self.require_event(ticket.event_id).await?;
        let bytes = self.renderer.render(&ticket, &event).await?;
        Ok(bytes)
    }

    /// The post-issuance render step, spawned fire-and-forget by the
    /// purchase flow: failures leave the tickets valid but processing.
    pub async fn render_pending(self: Arc<Self>, event_id: Uuid) {
        match self.regenerate_event(event_id).await {
            Ok(report) if report.errors.is_empty() => {}
            Ok(report) => {
                tracing::warn!(
                    event_id = %event_id,
                    failed = report.errors.len(),
                    rendered = report.regenerated_count,
                    "Some ticket images are still processing"
                );
            }
            Err(e) => {
                tracing::warn!(event_id = %event_id, error = %e, "Ticket image pass failed");
            }
        }
    }

    async fn render_and_store(&self, ticket: &EventTicket, event: &Event) -> Result<(), AppError> {
        let bytes = self.renderer.render(ticket, event).await?;
        let path = format!("tickets/{}/{}.png", event.id, ticket.id);
        let url = self.storage.upload(bytes, &path).await?;
        self.store.set_ticket_image_url(ticket.id, &url).await?;
        Ok(())
    }

    async fn require_ticket(&self, ticket_id: Uuid) -> Result<EventTicket, AppError> {
        self.store
            .find_ticket(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_id} was not found")))
    }

    async fn require_event(&self, event_id: Uuid) -> Result<Event, AppError> {
        self.store
            .find_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {event_id} was not found")))
    }
}

/// Scannable payload, bound to event, purchase, and seat. Generated once
/// at issuance and stable for the life of the ticket.
fn qr_payload(event_id: Uuid, purchase_id: Uuid, seat: i32) -> String {
    format!("atrium:{}:{}:{}:{}", event_id, purchase_id, seat, Uuid::new_v4())
}
