//! Configuration management for the trendwatch scanner
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.
//!
//! The messaging credential and recipient list are required; a process without
//! them cannot deliver alerts, so missing values are a fatal startup error
//! rather than a degraded mode.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Telegram delivery configuration
    pub telegram: TelegramConfig,

    /// Scanner configuration
    pub scanner: ScannerConfig,

    /// Adaptive rate limiter configuration
    pub limiter: LimiterConfig,

    /// Batch scheduler configuration
    pub scheduler: SchedulerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Telegram delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token (required)
    pub bot_token: String,

    /// Recipient chat IDs (required, non-empty). Group chats are declared
    /// with a `g` prefix and sign-flipped before sending.
    pub chat_ids: Vec<String>,
}

/// Scanner-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Geography restriction for trend queries (country code)
    pub geo: String,

    /// Lookback window for each trend query, in days
    pub window_days: u32,

    /// Per-term processing timeout in seconds
    pub term_timeout_secs: u64,

    /// Fixed pause between terms in seconds
    pub term_pause_secs: u64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Adaptive rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Hard request budget per rolling minute
    pub requests_per_minute: u32,

    /// Base delay floor in seconds
    pub base_delay_floor_secs: u64,

    /// Base delay ceiling in seconds
    pub base_delay_ceiling_secs: u64,

    /// Increment applied to the base delay on each rate-limit signal, seconds
    pub delay_increment_secs: u64,

    /// Cooldown slept after a rate-limit signal, seconds
    pub cooldown_secs: u64,
}

/// Batch scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between full-catalog scan cycles, in hours
    pub scan_interval_hours: u64,

    /// Wall-clock ceiling per batch, in minutes
    pub batch_ceiling_mins: u64,

    /// Rest period between batches, in seconds
    pub rest_secs: u64,

    /// Heartbeat interval while resting, in seconds
    pub rest_heartbeat_secs: u64,

    /// Heartbeat interval while idling between cycles, in minutes
    pub idle_heartbeat_mins: u64,

    /// Cooldown after a failed cycle, in seconds
    pub cycle_cooldown_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_IDS` are required; everything
    /// else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN not found in environment variables")?;

        let chat_ids: Vec<String> = std::env::var("TELEGRAM_CHAT_IDS")
            .context("TELEGRAM_CHAT_IDS not found in environment variables")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let scan_interval_hours = std::env::var("SCAN_INTERVAL_HOURS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(24);

        let geo = std::env::var("TRENDWATCH_GEO").unwrap_or_else(|_| String::from("US"));

        let requests_per_minute = std::env::var("TRENDWATCH_REQUESTS_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let mut config = Self::default();
        config.telegram = TelegramConfig {
            bot_token,
            chat_ids,
        };
        config.scanner.geo = geo;
        config.limiter.requests_per_minute = requests_per_minute;
        config.scheduler.scan_interval_hours = scan_interval_hours;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.is_empty() {
            anyhow::bail!("telegram bot_token must not be empty");
        }

        if self.telegram.chat_ids.is_empty() {
            anyhow::bail!("telegram chat_ids must not be empty");
        }

        if self.limiter.requests_per_minute == 0 {
            anyhow::bail!("requests_per_minute must be greater than 0");
        }

        if self.limiter.base_delay_floor_secs > self.limiter.base_delay_ceiling_secs {
            anyhow::bail!("base delay floor must not exceed ceiling");
        }

        if self.scanner.window_days < 30 {
            anyhow::bail!("window_days must be at least 30 for a usable baseline");
        }

        if self.scheduler.scan_interval_hours == 0 {
            anyhow::bail!("scan_interval_hours must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scanner.request_timeout_secs)
    }

    /// Get per-term timeout as Duration
    #[must_use]
    pub fn term_timeout(&self) -> Duration {
        Duration::from_secs(self.scanner.term_timeout_secs)
    }

    /// Get inter-term pause as Duration
    #[must_use]
    pub fn term_pause(&self) -> Duration {
        Duration::from_secs(self.scanner.term_pause_secs)
    }

    /// Get per-batch wall-clock ceiling as Duration
    #[must_use]
    pub fn batch_ceiling(&self) -> Duration {
        Duration::from_secs(self.scheduler.batch_ceiling_mins * 60)
    }

    /// Get inter-batch rest period as Duration
    #[must_use]
    pub fn rest_period(&self) -> Duration {
        Duration::from_secs(self.scheduler.rest_secs)
    }

    /// Get interval between full scan cycles as Duration
    #[must_use]
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.scan_interval_hours * 3600)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig {
                bot_token: String::new(),
                chat_ids: Vec::new(),
            },
            scanner: ScannerConfig {
                geo: String::from("US"),
                window_days: 90,
                term_timeout_secs: 120,
                term_pause_secs: 1,
                request_timeout_secs: 30,
            },
            limiter: LimiterConfig {
                requests_per_minute: 10,
                base_delay_floor_secs: 5,
                base_delay_ceiling_secs: 30,
                delay_increment_secs: 5,
                cooldown_secs: 90,
            },
            scheduler: SchedulerConfig {
                scan_interval_hours: 24,
                batch_ceiling_mins: 15,
                rest_secs: 120,
                rest_heartbeat_secs: 30,
                idle_heartbeat_mins: 15,
                cycle_cooldown_secs: 60,
            },
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
