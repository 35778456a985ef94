//! Unified error handling for the trendwatch crate
//!
//! This module consolidates all domain-specific errors into a single `Error`
//! enum, while keeping the domain errors usable on their own where a module
//! only ever produces one kind.
//!
//! Recoverability drives the retry policy: transient provider errors are
//! retried with bounded attempts and then degrade to "no data for this term
//! this cycle"; configuration errors are fatal at startup and nowhere else.

use std::io;
use thiserror::Error;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Provider payload decoding errors
    Decode,
    /// Alert delivery errors
    Delivery,
    /// Catalog and configuration errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Errors that can occur while fetching interest data from the provider
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit signal from the provider (HTTP 429)
    #[error("Provider rate limit exceeded")]
    RateLimited,

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded")]
    MaxRetriesExceeded,

    /// Malformed or out-of-range provider payload
    #[error("Decoding error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether a retry could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited | Self::Timeout => true,
            Self::ServerError(status) => matches!(status, 429 | 500 | 502 | 503 | 504),
            Self::MaxRetriesExceeded | Self::Decode(_) => false,
        }
    }

    /// Whether this error is the provider's rate-limit signal
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited | Self::ServerError(429))
    }
}

/// Errors that can occur while delivering alerts
#[derive(Error, Debug)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid channel configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Provider rejected the message
    #[error("Delivery rejected: {0}")]
    Rejected(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors that can occur while loading or validating the catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Catalog file could not be read
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] io::Error),

    /// Catalog file could not be parsed
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    /// Catalog failed validation
    #[error("Invalid catalog: {0}")]
    Invalid(String),
}

/// Unified error type for the trendwatch crate
#[derive(Error, Debug)]
pub enum Error {
    /// Trend-fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Alert delivery errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Catalog loading errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration errors (fatal at startup)
    #[error("Config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Channel(_) => true,
            Self::Catalog(_) => false,
            Self::Config(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Http(_) => true,
            Self::Other { .. } => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(FetchError::Decode(_)) => ErrorCategory::Decode,
            Self::Fetch(_) | Self::Http(_) => ErrorCategory::Network,
            Self::Channel(_) => ErrorCategory::Delivery,
            Self::Catalog(_) | Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::Other,
            Self::Json(_) => ErrorCategory::Decode,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
