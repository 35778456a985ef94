//! HTTP client for the interest-over-time provider
//!
//! This client handles the operational realities of the provider:
//! - every call is gated through the shared [`AdaptiveLimiter`]
//! - bounded retry with exponential backoff on transient failures
//! - a fresh HTTP client per retry, shedding any corrupted session state
//! - the anti-hijacking `)]}'` prefix the provider prepends to JSON bodies
//! - empty timelines decoded as the normal "no data" outcome

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::series::{InterestPoint, InterestSeries};
use super::{TrendQuery, TrendSource};
use crate::error::FetchError;
use crate::limiter::AdaptiveLimiter;

/// Default provider endpoint
const DEFAULT_ENDPOINT: &str = "https://trends.google.com/trends/api/interest-over-time";

/// Interest-over-time HTTP client
pub struct TrendsClient {
    /// Client used for first attempts; retries build a fresh one
    client: Client,

    /// Shared adaptive limiter gating every outbound call
    limiter: Arc<AdaptiveLimiter>,

    /// Maximum number of retry attempts for failed requests
    max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    base_delay_ms: u64,

    /// Request timeout
    timeout: Duration,

    /// Provider endpoint; overridable for mock-server tests
    endpoint: String,
}

impl TrendsClient {
    /// Create a client with default retry settings
    pub fn new(limiter: Arc<AdaptiveLimiter>, timeout: Duration) -> Result<Self, FetchError> {
        Self::with_config(limiter, timeout, 3)
    }

    /// Create a client with a custom retry bound
    pub fn with_config(
        limiter: Arc<AdaptiveLimiter>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(timeout)?,
            limiter,
            max_retries,
            base_delay_ms: 1000,
            timeout,
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Create a client pointed at a custom endpoint, for testing
    pub fn with_endpoint(
        limiter: Arc<AdaptiveLimiter>,
        timeout: Duration,
        max_retries: u32,
        endpoint: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let mut client = Self::with_config(limiter, timeout, max_retries)?;
        client.endpoint = endpoint.into();
        Ok(client)
    }

    /// Build the request URL for a query
    fn build_url(&self, query: &TrendQuery) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| FetchError::Decode(format!("invalid endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("term", &query.term)
            .append_pair("geo", &query.geo)
            .append_pair("start", &query.start.format("%Y-%m-%d").to_string())
            .append_pair("end", &query.end.format("%Y-%m-%d").to_string());
        Ok(url)
    }

    /// Fetch with limiter gating and retry
    async fn fetch_with_retry(
        &self,
        query: &TrendQuery,
    ) -> Result<Option<InterestSeries>, FetchError> {
        let url = self.build_url(query)?;
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            // Retries back off exponentially and shed the old session
            let client;
            let active = if attempt == 0 {
                &self.client
            } else {
                let delay = self.base_delay_ms * 2_u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                tracing::debug!(
                    term = %query.term,
                    attempt = attempt,
                    "Retrying trend fetch with a fresh session"
                );
                client = build_client(self.timeout)?;
                &client
            };

            self.limiter.acquire().await;

            match active.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let body = response.text().await.map_err(FetchError::Http)?;
                        return decode_timeline(&body, query);
                    }

                    if status.as_u16() == 429 {
                        self.limiter.on_rate_limited().await;
                        last_error = Some(FetchError::RateLimited);
                        continue;
                    }

                    if should_retry(status.as_u16()) {
                        last_error = Some(FetchError::ServerError(status.as_u16()));
                        continue;
                    }

                    return Err(FetchError::ServerError(status.as_u16()));
                }
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(FetchError::Timeout);
                    } else {
                        last_error = Some(FetchError::Http(e));
                    }
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::MaxRetriesExceeded))
    }
}

#[async_trait::async_trait]
impl TrendSource for TrendsClient {
    async fn fetch(&self, query: &TrendQuery) -> Result<Option<InterestSeries>, FetchError> {
        self.fetch_with_retry(query).await
    }
}

/// Build an HTTP client with the standard settings
fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .gzip(true)
        .build()
        .map_err(FetchError::Http)
}

/// Determine if a status code should trigger a retry
///
/// 429 is handled separately so the limiter sees the signal.
fn should_retry(status: u16) -> bool {
    matches!(status, 500 | 502 | 503 | 504)
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    default: Timeline,
}

#[derive(Debug, Deserialize)]
struct Timeline {
    #[serde(rename = "timelineData", default)]
    timeline_data: Vec<TimelineEntry>,
}

#[derive(Debug, Deserialize)]
struct TimelineEntry {
    /// Unix timestamp in seconds, as a string
    time: String,

    /// Interest values; the first entry is the queried term's
    #[serde(default)]
    value: Vec<f64>,
}

/// Decode a provider response body into a series
///
/// The provider prefixes JSON bodies with `)]}'` on its own line; strip it
/// before parsing. An empty timeline is the normal "no data" outcome.
fn decode_timeline(
    body: &str,
    query: &TrendQuery,
) -> Result<Option<InterestSeries>, FetchError> {
    let json = body
        .strip_prefix(")]}'")
        .map(|rest| rest.trim_start_matches([',', '\n', '\r']))
        .unwrap_or(body);

    let response: TimelineResponse = serde_json::from_str(json)
        .map_err(|e| FetchError::Decode(format!("malformed timeline payload: {e}")))?;

    if response.default.timeline_data.is_empty() {
        return Ok(None);
    }

    let mut points = Vec::with_capacity(response.default.timeline_data.len());
    for entry in &response.default.timeline_data {
        let secs: i64 = entry
            .time
            .parse()
            .map_err(|_| FetchError::Decode(format!("bad timestamp: {}", entry.time)))?;
        let timestamp: DateTime<Utc> = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| FetchError::Decode(format!("timestamp out of range: {secs}")))?;
        let value = *entry
            .value
            .first()
            .ok_or_else(|| FetchError::Decode("timeline entry with no value".into()))?;

        points.push(InterestPoint { timestamp, value });
    }

    InterestSeries::from_points(&query.term, &query.geo, points, query.end).map(Some)
}
