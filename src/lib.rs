//! trendwatch - search-interest breakout scanner
//!
//! A long-running scanner that polls an interest-over-time provider for a
//! fixed catalog of technology categories, detects breakout spikes against
//! rolling baselines, and pushes alerts to Telegram.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`catalog`] - Category/term/symbol catalog loaded from TOML
//! - [`limiter`] - Adaptive rate limiting for the trend provider
//! - [`trends`] - Interest-over-time source and HTTP client
//! - [`detect`] - Baseline statistics and the breakout rule
//! - [`scanner`] - Per-category scanning with bounded timeouts
//! - [`sched`] - Batch scheduling, rests, heartbeats, cycle loop
//! - [`alert`] - Alert formatting and Telegram delivery
//!
//! # Example
//!
//! ```no_run
//! use trendwatch::catalog::Catalog;
//! use trendwatch::config::Config;
//! use trendwatch::scanner::ScannerContext;
//! use trendwatch::sched::BatchScheduler;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let ctx = ScannerContext::from_config(config)?;
//!     let scheduler = BatchScheduler::new(ctx, Catalog::builtin());
//!     scheduler.run_forever().await;
//!     Ok(())
//! }
//! ```

pub mod alert;
pub mod catalog;
pub mod config;
pub mod detect;
pub mod error;
pub mod limiter;
pub mod scanner;
pub mod sched;
pub mod trends;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::alert::{AlertDispatcher, Messenger, Recipient, TelegramChannel};
    pub use crate::catalog::{Catalog, Category, RelatedSymbol};
    pub use crate::config::Config;
    pub use crate::detect::{BreakoutDetector, BreakoutEvent, DetectorConfig};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::limiter::AdaptiveLimiter;
    pub use crate::scanner::ScannerContext;
    pub use crate::sched::{BatchScheduler, CycleSummary, ScanPhase};
    pub use crate::trends::{InterestSeries, TrendQuery, TrendSource, TrendsClient};
}

// Direct re-exports for convenience
pub use catalog::Catalog;
pub use config::Config;
pub use detect::{BreakoutDetector, BreakoutEvent};
pub use error::{Error, Result};
