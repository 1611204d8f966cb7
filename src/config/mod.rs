use std::env;
use std::time::Duration;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 10;

pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub discord_bot_token: String,
    pub discord_guild_id: String,
    pub render_service_url: String,
    pub storage_upload_base: String,
    pub storage_public_base: String,
    /// Bound on every outbound call: billing provider, chat-role API,
    /// image renderer, blob store. Expiry is treated as failure.
    pub external_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/atrium".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(3001),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            discord_bot_token: env::var("DISCORD_BOT_TOKEN").unwrap_or_default(),
            discord_guild_id: env::var("DISCORD_GUILD_ID").unwrap_or_default(),
            render_service_url: env::var("TICKET_RENDER_URL")
                .unwrap_or_else(|_| "http://localhost:7001/render".to_string()),
            storage_upload_base: env::var("STORAGE_UPLOAD_BASE")
                .unwrap_or_else(|_| "http://localhost:7002/blobs".to_string()),
            storage_public_base: env::var("STORAGE_PUBLIC_BASE")
                .unwrap_or_else(|_| "http://localhost:7002/public".to_string()),
            external_timeout: env::var("EXTERNAL_TIMEOUT_SECS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_EXTERNAL_TIMEOUT_SECS)),
        }
    }
}
