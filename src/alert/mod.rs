//! Alert formatting and delivery
//!
//! This module turns breakout findings into human-readable messages and
//! hands them to the messaging channel. Delivery is per-recipient and
//! isolated: one recipient failing never blocks the others.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │       AlertDispatcher        │
//! │  - message formatting        │
//! │  - per-recipient fan-out     │
//! │  - partial-failure isolation │
//! └──────────────────────────────┘
//!               │
//!               ▼
//!        ┌────────────┐
//!        │  Messenger │  (Telegram, or a test double)
//!        └────────────┘
//! ```

pub mod dispatcher;
pub mod telegram;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ChannelError;

pub use dispatcher::AlertDispatcher;
pub use telegram::TelegramChannel;

/// A resolved alert recipient
///
/// Recipient IDs come from configuration as opaque strings. A `g` prefix
/// declares a group chat; the provider addresses groups by the negated ID,
/// so the normalized form is sign-flipped before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Raw numeric ID as configured
    pub id: i64,

    /// Whether this recipient is a group chat
    pub group: bool,
}

impl Recipient {
    /// Parse a recipient from its configured form
    pub fn parse(raw: &str) -> Result<Self, ChannelError> {
        let raw = raw.trim();
        let (group, digits) = match raw.strip_prefix('g') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let id: i64 = digits
            .parse()
            .map_err(|_| ChannelError::InvalidConfig(format!("invalid recipient id: {raw}")))?;

        Ok(Self { id, group })
    }

    /// Parse a whole recipient list, rejecting an empty result
    pub fn parse_all(raw: &[String]) -> Result<Vec<Self>, ChannelError> {
        let recipients: Vec<Self> = raw
            .iter()
            .map(|s| Self::parse(s))
            .collect::<Result<_, _>>()?;

        if recipients.is_empty() {
            return Err(ChannelError::InvalidConfig(
                "recipient list is empty".into(),
            ));
        }

        Ok(recipients)
    }

    /// The ID to put on the wire: sign-flipped for groups
    pub fn normalized_id(&self) -> i64 {
        if self.group {
            -self.id.abs()
        } else {
            self.id
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized_id())
    }
}

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Whether the message was delivered
    pub success: bool,

    /// Channel that attempted the delivery
    pub channel: String,

    /// Normalized recipient ID
    pub recipient: i64,

    /// Optional detail about the attempt
    pub message: Option<String>,

    /// Timestamp of the attempt
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DeliveryStatus {
    /// Create a successful delivery status
    pub fn success(channel: impl Into<String>, recipient: i64) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            recipient,
            message: None,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a failed delivery status
    pub fn failure(channel: impl Into<String>, recipient: i64, message: impl Into<String>) -> Self {
        Self {
            success: false,
            channel: channel.into(),
            recipient,
            message: Some(message.into()),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "SUCCESS" } else { "FAILED" };
        write!(f, "[{status}] {} -> {}", self.channel, self.recipient)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Trait for messaging channels
///
/// Implement this trait to deliver alerts through a new provider.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Send a message to one recipient
    async fn send(&self, recipient: &Recipient, text: &str)
        -> Result<DeliveryStatus, ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_parse_user() {
        let r = Recipient::parse("123456789").unwrap();
        assert!(!r.group);
        assert_eq!(r.normalized_id(), 123456789);
    }

    #[test]
    fn test_recipient_parse_group_sign_flips() {
        let r = Recipient::parse("g987654").unwrap();
        assert!(r.group);
        assert_eq!(r.normalized_id(), -987654);

        // Already-negative group IDs normalize to the same wire form
        let r = Recipient::parse("g-987654").unwrap();
        assert_eq!(r.normalized_id(), -987654);
    }

    #[test]
    fn test_recipient_parse_rejects_garbage() {
        assert!(Recipient::parse("abc").is_err());
        assert!(Recipient::parse("").is_err());
    }

    #[test]
    fn test_parse_all_rejects_empty_list() {
        assert!(Recipient::parse_all(&[]).is_err());

        let list = vec!["123".to_string(), "g456".to_string()];
        let recipients = Recipient::parse_all(&list).unwrap();
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients[1].normalized_id(), -456);
    }

    #[test]
    fn test_delivery_status_display() {
        let ok = DeliveryStatus::success("telegram", 123);
        assert!(ok.to_string().contains("SUCCESS"));

        let failed = DeliveryStatus::failure("telegram", 123, "timeout");
        assert!(failed.to_string().contains("FAILED"));
        assert!(failed.to_string().contains("timeout"));
    }
}
