use std::time::Duration;

use async_trait::async_trait;

use crate::clients::{ChatRoleClient, ClientError};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Assigns guild roles through the Discord REST API. Used only on the
/// best-effort sync path after a reconciliation commits.
pub struct DiscordRoleClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    guild_id: String,
}

impl DiscordRoleClient {
    pub fn new(bot_token: String, guild_id: String, timeout: Duration) -> Self {
        Self::with_api_base(DISCORD_API_BASE.to_string(), bot_token, guild_id, timeout)
    }

    pub fn with_api_base(
        api_base: String,
        bot_token: String,
        guild_id: String,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_base,
            bot_token,
            guild_id,
        }
    }
}

#[async_trait]
impl ChatRoleClient for DiscordRoleClient {
    async fn assign_role(
        &self,
        external_user_id: &str,
        role_id: &str,
    ) -> Result<bool, ClientError> {
        let url = format!(
            "{}/guilds/{}/members/{}/roles/{}",
            self.api_base.trim_end_matches('/'),
            self.guild_id,
            external_user_id,
            role_id
        );
        let response = self
            .http
            .put(url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::warn!(
                status = %response.status(),
                user = %external_user_id,
                "Discord rejected role assignment"
            );
            return Ok(false);
        }
        Ok(true)
    }
}
