//! Integration tests for TrendsClient using wiremock
//!
//! These tests validate the HTTP client's retry behavior, rate-limit
//! handling and payload decoding against a mock provider.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use trendwatch::config::LimiterConfig;
use trendwatch::error::FetchError;
use trendwatch::limiter::AdaptiveLimiter;
use trendwatch::trends::{TrendQuery, TrendSource, TrendsClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Limiter with zeroed delays so tests run at full speed
fn fast_limiter() -> Arc<AdaptiveLimiter> {
    Arc::new(AdaptiveLimiter::new(&LimiterConfig {
        requests_per_minute: 1000,
        base_delay_floor_secs: 0,
        base_delay_ceiling_secs: 30,
        delay_increment_secs: 0,
        cooldown_secs: 0,
    }))
}

fn client(server: &MockServer, max_retries: u32) -> (TrendsClient, Arc<AdaptiveLimiter>) {
    let limiter = fast_limiter();
    let client = TrendsClient::with_endpoint(
        Arc::clone(&limiter),
        Duration::from_secs(5),
        max_retries,
        format!("{}/interest-over-time", server.uri()),
    )
    .unwrap();
    (client, limiter)
}

fn query(term: &str) -> TrendQuery {
    TrendQuery::for_window(term, "US", Utc::now().date_naive(), 90)
}

#[tokio::test]
async fn test_fetch_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/interest-over-time"))
        .and(query_param("term", "quantum computing"))
        .and(query_param("geo", "US"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(common::timeline_body(&[10.0, 20.0, 96.0], 0)),
        )
        .mount(&server)
        .await;

    let (client, _) = client(&server, 2);
    let series = client.fetch(&query("quantum computing")).await.unwrap();

    let series = series.expect("series should be present");
    assert_eq!(series.len(), 3);
    assert_eq!(series.peak().unwrap().value, 96.0);
    assert!(!series.stale_latest());
}

#[tokio::test]
async fn test_empty_timeline_is_no_data_not_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/interest-over-time"))
        .respond_with(ResponseTemplate::new(200).set_body_string(common::empty_body()))
        .mount(&server)
        .await;

    let (client, _) = client(&server, 2);
    let result = client.fetch(&query("brand new term")).await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_missing_today_falls_back_and_flags() {
    let server = MockServer::start().await;

    // The provider is lagging one day behind
    Mock::given(method("GET"))
        .and(path("/interest-over-time"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(common::timeline_body(&[10.0, 20.0, 96.0], 1)),
        )
        .mount(&server)
        .await;

    let (client, _) = client(&server, 2);
    let series = client.fetch(&query("web3")).await.unwrap().unwrap();

    assert!(series.stale_latest());
    assert_eq!(
        series.latest().unwrap().date(),
        Utc::now().date_naive() - chrono::Duration::days(1)
    );
}

#[tokio::test]
async fn test_server_error_triggers_retry() {
    let server = MockServer::start().await;

    // Fail once with 503, then succeed
    Mock::given(method("GET"))
        .and(path("/interest-over-time"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/interest-over-time"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(common::timeline_body(&[50.0], 0)),
        )
        .mount(&server)
        .await;

    let (client, _) = client(&server, 2);
    let result = client.fetch(&query("edge computing")).await;

    assert!(result.is_ok(), "should succeed after retry: {:?}", result.err());
}

#[tokio::test]
async fn test_client_error_does_not_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/interest-over-time"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client(&server, 3);
    let result = client.fetch(&query("nope")).await;

    assert!(matches!(result, Err(FetchError::ServerError(404))));
}

#[tokio::test]
async fn test_rate_limit_raises_adaptive_delay_and_surfaces() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/interest-over-time"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let (client, limiter) = client(&server, 1);
    let result = client.fetch(&query("ai technology")).await;

    // Exhausted retries surface the rate-limit signal to the caller
    assert!(matches!(result, Err(FetchError::RateLimited)));

    // Both attempts hit 429 and the limiter counted them
    let snapshot = limiter.snapshot();
    assert_eq!(snapshot.consecutive_429s, 2);
}

#[tokio::test]
async fn test_hijacking_prefix_stripped() {
    let server = MockServer::start().await;

    let body = format!(")]}}',\n{}", common::timeline_body(&[42.0], 0));
    Mock::given(method("GET"))
        .and(path("/interest-over-time"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let (client, _) = client(&server, 0);
    let series = client.fetch(&query("dao technology")).await.unwrap().unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series.latest().unwrap().value, 42.0);
}

#[tokio::test]
async fn test_malformed_payload_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/interest-over-time"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
        .mount(&server)
        .await;

    let (client, _) = client(&server, 0);
    let result = client.fetch(&query("web3")).await;

    assert!(matches!(result, Err(FetchError::Decode(_))));
}
