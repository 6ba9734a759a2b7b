//! Telegram Bot API notifier

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::common::errors::{MonitorError, Result};
use crate::common::traits::Notifier;
use crate::config::types::TelegramConfig;

/// `sendMessage` request body
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends MarkdownV2 messages through the Telegram Bot API
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    pub fn new(api_url: &str, bot_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MonitorError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let token = config
            .bot_token
            .as_deref()
            .ok_or_else(|| MonitorError::Configuration("Telegram bot token missing".to_string()))?;
        Self::new(&config.api_url, token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip(self, text), fields(len = text.len()))]
    async fn send(&self, channel: &str, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let body = SendMessageRequest {
            chat_id: channel,
            text,
            parse_mode: "MarkdownV2",
            disable_web_page_preview: true,
        };

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let reply: BotApiResponse = response.json().await.map_err(|e| {
            MonitorError::Notification(format!("Unreadable reply (status {}): {}", status, e))
        })?;

        if !status.is_success() || !reply.ok {
            return Err(MonitorError::Notification(format!(
                "Telegram returned status {}: {}",
                status,
                reply.description.unwrap_or_default()
            )));
        }

        debug!("Message delivered");
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "Telegram"
    }
}
