//! Interest-over-time data source
//!
//! This module abstracts the external trends provider behind the
//! [`TrendSource`] trait: one query in, one [`InterestSeries`] (or a normal
//! "no data" outcome) back. The HTTP implementation lives in [`client`] and
//! routes every outbound call through the shared adaptive limiter.

pub mod client;
pub mod series;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::FetchError;

pub use client::TrendsClient;
pub use series::{InterestPoint, InterestSeries};

/// A query for one term's interest over a date window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendQuery {
    /// Search term
    pub term: String,

    /// Window start (inclusive)
    pub start: NaiveDate,

    /// Window end (inclusive); normally today
    pub end: NaiveDate,

    /// Geography restriction (country code)
    pub geo: String,
}

impl TrendQuery {
    /// Build a query for the `days`-long window ending at `end`
    pub fn for_window(term: impl Into<String>, geo: impl Into<String>, end: NaiveDate, days: u32) -> Self {
        Self {
            term: term.into(),
            start: end - chrono::Duration::days(i64::from(days)),
            end,
            geo: geo.into(),
        }
    }
}

/// Abstraction over the interest-over-time provider
///
/// `Ok(None)` is the normal outcome for terms the provider has no data for
/// (new or low-volume terms), not a fault.
#[async_trait]
pub trait TrendSource: Send + Sync {
    /// Fetch the interest series for one query
    async fn fetch(&self, query: &TrendQuery) -> Result<Option<InterestSeries>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_window() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let query = TrendQuery::for_window("quantum computing", "US", end, 90);

        assert_eq!(query.start, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(query.end, end);
        assert_eq!(query.geo, "US");
    }
}
