//! Outbound interaction callback client.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CALLBACK_API_BASE: &str = "https://discord.com";
pub const RESPONSE_TYPE_PONG: u8 = 1;
pub const RESPONSE_TYPE_CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// JSON payload posted to the interaction callback endpoint.
pub struct InteractionCallback {
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: InteractionCallbackData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCallbackData {
    pub content: String,
}

impl InteractionCallback {
    pub fn channel_message(content: impl Into<String>) -> Self {
        Self {
            kind: RESPONSE_TYPE_CHANNEL_MESSAGE_WITH_SOURCE,
            data: InteractionCallbackData {
                content: content.into(),
            },
        }
    }
}

/// Delivers a command's reply back to the calling platform.
#[async_trait]
pub trait InteractionResponder: Send + Sync {
    async fn send(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        callback: &InteractionCallback,
    ) -> Result<()>;
}

#[derive(Debug, Clone)]
/// Posts callbacks to `{api_base}/api/v10/interactions/{id}/{token}/callback`.
pub struct HttpInteractionResponder {
    http: reqwest::Client,
    api_base: Url,
}

impl HttpInteractionResponder {
    pub fn new(api_base: &str, request_timeout_ms: u64) -> Result<Self> {
        let api_base = Url::parse(api_base.trim())
            .with_context(|| format!("invalid callback api base '{api_base}'"))?;
        if api_base.cannot_be_a_base() {
            bail!("callback api base '{api_base}' cannot carry a path");
        }
        let http = reqwest::Client::builder()
            .user_agent("daysince-interactions")
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create interaction callback client")?;
        Ok(Self { http, api_base })
    }

    /// Builds the callback URL; id and token are percent-encoded as path segments.
    pub fn callback_url(&self, interaction_id: &str, interaction_token: &str) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("callback api base cannot carry a path"))?
            .pop_if_empty()
            .extend([
                "api",
                "v10",
                "interactions",
                interaction_id,
                interaction_token,
                "callback",
            ]);
        Ok(url)
    }
}

#[async_trait]
impl InteractionResponder for HttpInteractionResponder {
    async fn send(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        callback: &InteractionCallback,
    ) -> Result<()> {
        let url = self.callback_url(interaction_id, interaction_token)?;
        let response = self
            .http
            .post(url)
            .json(callback)
            .send()
            .await
            .context("interaction callback request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "interaction callback returned status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 200)
            );
        }
        Ok(())
    }
}

fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
