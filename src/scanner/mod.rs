//! Category scanning
//!
//! The scanner walks one category at a time, terms strictly in catalog
//! order, with no parallelism: the provider's rate limit is global, so a
//! single sequential gate is the whole point. Each term's processing is
//! wrapped in a bounded timeout so a stuck fetch degrades to a logged skip
//! instead of blocking the loop, and a fixed pause between terms puts a
//! floor on request cadence independent of the limiter's own delay.
//!
//! Breakout alerts go out immediately, before the scanner advances to the
//! next term. Per-term alerts are latency-sensitive; batch summaries are
//! not.

use std::sync::Arc;

use chrono::Utc;

use crate::alert::{AlertDispatcher, Recipient, TelegramChannel};
use crate::catalog::Category;
use crate::config::Config;
use crate::detect::{BreakoutDetector, BreakoutEvent};
use crate::error::Result;
use crate::limiter::AdaptiveLimiter;
use crate::trends::{TrendQuery, TrendSource, TrendsClient};

/// Everything a scan needs, passed explicitly
///
/// The context owns the rate limiter state, the trend source, the detector
/// and the dispatcher. There is no ambient or global state; a second
/// context would be a second, independent scanner.
pub struct ScannerContext {
    config: Config,
    limiter: Arc<AdaptiveLimiter>,
    source: Box<dyn TrendSource>,
    detector: BreakoutDetector,
    dispatcher: AlertDispatcher,
}

impl ScannerContext {
    /// Build the production context from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let limiter = Arc::new(AdaptiveLimiter::new(&config.limiter));
        let source = Box::new(TrendsClient::new(
            Arc::clone(&limiter),
            config.request_timeout(),
        )?);

        let channel = TelegramChannel::new(&config.telegram.bot_token)?;
        let recipients = Recipient::parse_all(&config.telegram.chat_ids)?;
        let dispatcher = AlertDispatcher::new(Box::new(channel), recipients)?;

        Ok(Self {
            config,
            limiter,
            source,
            detector: BreakoutDetector::default(),
            dispatcher,
        })
    }

    /// Build a context from explicit parts (used by tests and tooling)
    ///
    /// The limiter is passed in so a source that already wraps it keeps
    /// sharing the same state.
    pub fn with_parts(
        config: Config,
        limiter: Arc<AdaptiveLimiter>,
        source: Box<dyn TrendSource>,
        detector: BreakoutDetector,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            config,
            limiter,
            source,
            detector,
            dispatcher,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared rate limiter
    pub fn limiter(&self) -> &AdaptiveLimiter {
        &self.limiter
    }

    /// The alert dispatcher
    pub fn dispatcher(&self) -> &AlertDispatcher {
        &self.dispatcher
    }

    /// Scan one category, term by term
    ///
    /// Faults are contained at the term level: a failed or timed-out term is
    /// counted and skipped, and the category keeps going.
    pub async fn scan_category(&self, category: &Category) -> CategoryOutcome {
        let mut outcome = CategoryOutcome::new(&category.name);

        tracing::info!(
            category = %category.name,
            terms = category.terms.len(),
            "Scanning category"
        );

        for term in &category.terms {
            let result = tokio::time::timeout(
                self.config.term_timeout(),
                self.scan_term(category, term),
            )
            .await;

            match result {
                Ok(TermOutcome::Breakout(event)) => {
                    outcome.terms_scanned += 1;
                    outcome.events.push(event);
                }
                Ok(TermOutcome::Quiet) => outcome.terms_scanned += 1,
                Ok(TermOutcome::NoData) => {
                    outcome.terms_scanned += 1;
                    outcome.no_data += 1;
                    tracing::debug!(term = %term, "No trend data available");
                }
                Ok(TermOutcome::Failed) => outcome.failed += 1,
                Err(_) => {
                    outcome.failed += 1;
                    tracing::warn!(
                        term = %term,
                        timeout_secs = self.config.term_timeout().as_secs(),
                        "Term processing timed out, skipping"
                    );
                }
            }

            // Cadence floor between terms, independent of the limiter
            tokio::time::sleep(self.config.term_pause()).await;
        }

        outcome
    }

    /// Fetch, evaluate and (on a hit) immediately alert for one term
    async fn scan_term(&self, category: &Category, term: &str) -> TermOutcome {
        let today = Utc::now().date_naive();
        let query = TrendQuery::for_window(
            term,
            &self.config.scanner.geo,
            today,
            self.config.scanner.window_days,
        );

        let series = match self.source.fetch(&query).await {
            Ok(Some(series)) => series,
            Ok(None) => return TermOutcome::NoData,
            Err(e) => {
                tracing::warn!(term = %term, error = %e, "Trend fetch failed");
                return TermOutcome::Failed;
            }
        };

        match self.detector.evaluate(&series, term, &category.name) {
            Some(event) => {
                tracing::info!(
                    term = %term,
                    peak = event.peak,
                    baseline_avg = event.baseline_avg,
                    z_score = event.z_score,
                    "Breakout detected"
                );
                // Alert before advancing so notification order matches
                // detection order
                self.dispatcher
                    .dispatch_breakout(&event, &category.symbols)
                    .await;
                TermOutcome::Breakout(event)
            }
            None => TermOutcome::Quiet,
        }
    }
}

/// Result of scanning one term
enum TermOutcome {
    /// Detector fired; the alert has already been dispatched
    Breakout(BreakoutEvent),
    /// Data present, no breakout
    Quiet,
    /// Provider has no data for this term (normal)
    NoData,
    /// Fetch or processing failed after retries
    Failed,
}

/// Aggregated result of scanning one category
#[derive(Debug, Clone)]
pub struct CategoryOutcome {
    /// Category name
    pub category: String,

    /// Breakouts detected, in detection order
    pub events: Vec<BreakoutEvent>,

    /// Terms that completed (with or without data)
    pub terms_scanned: usize,

    /// Terms the provider had no data for
    pub no_data: usize,

    /// Terms that failed or timed out
    pub failed: usize,
}

impl CategoryOutcome {
    fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            events: Vec::new(),
            terms_scanned: 0,
            no_data: 0,
            failed: 0,
        }
    }

    /// Whether every term in the category failed
    pub fn all_failed(&self) -> bool {
        self.terms_scanned == 0 && self.failed > 0
    }
}
