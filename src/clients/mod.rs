//! External collaborators behind traits: billing provider, chat-role API,
//! QR/image renderer, and object storage. Every HTTP implementation bounds
//! its calls with the configured timeout; callers treat expiry as failure.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Event, EventTicket};
use crate::utils::error::AppError;

pub mod billing;
pub mod chat;
pub mod render;
pub mod storage;

pub use billing::StripeBilling;
pub use chat::DiscordRoleClient;
pub use render::HttpImageRenderer;
pub use storage::HttpBlobStorage;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

/// A checkout session as the billing provider reports it.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub payment_status: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSubscription {
    pub id: String,
    pub price_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProviderCustomer {
    pub id: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn retrieve_checkout_session(&self, id: &str) -> Result<CheckoutSession, ClientError>;

    async fn retrieve_subscription(&self, id: &str) -> Result<ProviderSubscription, ClientError>;

    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProviderCustomer>, ClientError>;

    async fn create_customer(&self, email: &str) -> Result<ProviderCustomer, ClientError>;
}

#[async_trait]
pub trait ChatRoleClient: Send + Sync {
    /// Grants the role on the chat platform. `Ok(false)` means the platform
    /// rejected the assignment; `Err` means the call itself failed.
    async fn assign_role(&self, external_user_id: &str, role_id: &str)
        -> Result<bool, ClientError>;
}

#[async_trait]
pub trait QrRenderer: Send + Sync {
    /// Renders the shareable ticket image (QR plus event metadata) as PNG.
    async fn render(&self, ticket: &EventTicket, event: &Event) -> Result<Vec<u8>, ClientError>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads the bytes and returns the public URL they are served from.
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String, ClientError>;
}
