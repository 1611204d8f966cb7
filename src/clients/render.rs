use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::clients::{ClientError, QrRenderer};
use crate::models::{Event, EventTicket};

/// Talks to the external image-render service: it encodes the scannable
/// payload as a QR and composes it with the event metadata into a
/// shareable PNG.
pub struct HttpImageRenderer {
    http: reqwest::Client,
    render_url: String,
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    qr_data: &'a str,
    event_title: &'a str,
    event_start: String,
    location: Option<&'a str>,
    seat: i32,
}

impl HttpImageRenderer {
    pub fn new(render_url: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self { http, render_url }
    }
}

#[async_trait]
impl QrRenderer for HttpImageRenderer {
    async fn render(&self, ticket: &EventTicket, event: &Event) -> Result<Vec<u8>, ClientError> {
        let request = RenderRequest {
            qr_data: &ticket.qr_code_data,
            event_title: &event.title,
            event_start: event.start_time.to_rfc3339(),
            location: event.location.as_deref(),
            seat: ticket.seat,
        };
        let response = self.http.post(&self.render_url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UnexpectedResponse(format!(
                "image renderer returned {status}"
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
