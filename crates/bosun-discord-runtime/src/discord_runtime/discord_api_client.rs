//! Discord REST client used for gateway discovery and message delivery.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use bosun_commands::ChatMessage;
use bosun_core::{truncate_for_chat, truncate_for_error};

const DISCORD_SAFE_MAX_CHARS: usize = 2000;
const EMBED_TITLE_MAX_CHARS: usize = 256;
const EMBED_FIELD_MAX_CHARS: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
struct GatewayBotResponse {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CreatedMessageResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Clone)]
pub(super) struct DiscordPostedMessage {
    pub(super) id: String,
}

#[derive(Clone)]
pub(super) struct DiscordApiClient {
    http: reqwest::Client,
    api_base: String,
}

impl DiscordApiClient {
    pub(super) fn new(
        api_base: String,
        bot_token: String,
        request_timeout_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("Bosun-discord-bridge"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bot {}", bot_token.trim()))
                .context("discord bot token is not a valid header value")?,
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create discord api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub(super) async fn resolve_gateway_url(&self) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/gateway/bot", self.api_base))
            .send()
            .await
            .context("discord gateway lookup request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "discord gateway lookup failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        let parsed = response
            .json::<GatewayBotResponse>()
            .await
            .context("failed to decode discord gateway lookup")?;
        parsed
            .url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("discord gateway lookup did not return url"))
    }

    pub(super) async fn send_message(
        &self,
        channel_id: &str,
        message: &ChatMessage,
    ) -> Result<DiscordPostedMessage> {
        let payload = message_payload(message);
        let response = self
            .http
            .post(format!("{}/channels/{}/messages", self.api_base, channel_id))
            .json(&payload)
            .send()
            .await
            .context("discord message send request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "discord message send failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 800)
            );
        }
        let parsed = response
            .json::<CreatedMessageResponse>()
            .await
            .context("failed to decode discord message response")?;
        let id = parsed
            .id
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| anyhow!("discord message response missing id"))?;
        Ok(DiscordPostedMessage { id })
    }
}

/// Builds the create-message payload: plain content, or one embed per card.
pub(super) fn message_payload(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::Text(text) => {
            json!({ "content": truncate_for_chat(text, DISCORD_SAFE_MAX_CHARS) })
        }
        ChatMessage::Card {
            title,
            url,
            color,
            fields,
        } => {
            let embed_fields = fields
                .iter()
                .map(|field| {
                    json!({
                        "name": field.label,
                        "value": truncate_for_chat(&field.value, EMBED_FIELD_MAX_CHARS),
                        "inline": true,
                    })
                })
                .collect::<Vec<_>>();
            let mut embed = json!({
                "title": truncate_for_chat(title, EMBED_TITLE_MAX_CHARS),
                "color": color,
                "fields": embed_fields,
            });
            if let Some(url) = url {
                embed["url"] = Value::String(url.clone());
            }
            json!({ "embeds": [embed] })
        }
    }
}
