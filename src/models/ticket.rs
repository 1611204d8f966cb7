use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An issued proof of a paid seat. `qr_code_data` is written once at
/// issuance and never changes; `ticket_image_url` stays NULL while the
/// shareable image is still rendering and is the only field regeneration
/// may overwrite.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventTicket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub purchase_id: Uuid,
    pub seat: i32,
    pub qr_code_data: String,
    pub ticket_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventTicket {
    /// Still waiting on the image render/upload step.
    pub fn is_processing(&self) -> bool {
        self.ticket_image_url.is_none()
    }
}
