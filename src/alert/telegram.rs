//! Telegram delivery channel
//!
//! Sends alerts through the Telegram Bot API (`sendMessage`) with HTML
//! formatting. Delivery errors are reported as failed [`DeliveryStatus`]
//! values rather than hard errors, so the dispatcher can keep fanning out
//! to the remaining recipients.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{DeliveryStatus, Messenger, Recipient};
use crate::error::ChannelError;

/// Default Bot API host
const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Telegram Bot API channel
pub struct TelegramChannel {
    client: Client,
    bot_token: String,

    /// API host; overridable for mock-server tests
    base_url: String,

    /// Maximum retry attempts per recipient
    max_retries: u32,
}

impl TelegramChannel {
    /// Create a channel for the given bot token
    pub fn new(bot_token: impl Into<String>) -> Result<Self, ChannelError> {
        Self::with_base_url(bot_token, DEFAULT_API_URL)
    }

    /// Create a channel pointed at a custom API host, for testing
    pub fn with_base_url(
        bot_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let bot_token = bot_token.into();
        if bot_token.is_empty() {
            return Err(ChannelError::InvalidConfig(
                "bot token cannot be empty".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(ChannelError::Http)?;

        Ok(Self {
            client,
            bot_token,
            base_url: base_url.into(),
            max_retries: 3,
        })
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.bot_token)
    }

    /// Send the request with retry logic
    async fn send_with_retry(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2_u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
                tracing::debug!(
                    chat_id = chat_id,
                    attempt = attempt,
                    "Retrying Telegram delivery"
                );
            }

            match self.client.post(self.send_url()).json(&payload).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(());
                    }

                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unreadable response body".to_string());
                    last_error = Some(ChannelError::Rejected(format!("HTTP {status}: {body}")));

                    // Client errors (bad chat id, malformed markup) will not
                    // heal on retry
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => {
                    last_error = Some(ChannelError::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ChannelError::Rejected("unknown error".into())))
    }
}

#[async_trait]
impl Messenger for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(
        &self,
        recipient: &Recipient,
        text: &str,
    ) -> Result<DeliveryStatus, ChannelError> {
        let chat_id = recipient.normalized_id();

        match self.send_with_retry(chat_id, text).await {
            Ok(()) => {
                tracing::info!(chat_id = chat_id, "Alert delivered");
                Ok(DeliveryStatus::success(self.name(), chat_id))
            }
            Err(e) => {
                tracing::error!(chat_id = chat_id, error = %e, "Alert delivery failed");
                Ok(DeliveryStatus::failure(self.name(), chat_id, e.to_string()))
            }
        }
    }
}
