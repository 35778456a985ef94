//! Batch scheduling and the outer scan-cycle loop
//!
//! The scheduler drives the scanner over the catalog in wall-clock-bounded
//! batches with unconditional rest periods in between, then sleeps out the
//! remainder of the cycle interval in heartbeat-sized chunks so liveness
//! stays observable during long idle stretches.
//!
//! State machine: `Idle -> Batching -> Resting -> Batching -> ... ->
//! CycleComplete -> (idle sleep) -> Idle`. A cycle that blows up is logged,
//! cooled down and restarted; the loop itself never exits.

use std::panic::AssertUnwindSafe;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;

use crate::catalog::Catalog;
use crate::detect::BreakoutEvent;
use crate::scanner::{CategoryOutcome, ScannerContext};

/// Observable scheduler phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    /// Waiting for the next cycle
    Idle,
    /// Actively scanning a batch
    Batching,
    /// Resting between batches
    Resting,
    /// Cycle finished, summary being dispatched
    CycleComplete,
}

impl ScanPhase {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Batching => "batching",
            Self::Resting => "resting",
            Self::CycleComplete => "cycle_complete",
        }
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregated result of one full catalog traversal
#[derive(Debug, Clone)]
pub struct CycleSummary {
    /// When the cycle started
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration of the cycle (scanning plus rests)
    pub duration: Duration,

    /// Number of categories in each batch, in batch order
    pub batch_sizes: Vec<usize>,

    /// Categories scanned this cycle
    pub categories_scanned: usize,

    /// Categories where every term failed
    pub categories_failed: usize,

    /// Terms that completed
    pub terms_scanned: usize,

    /// Terms the provider had no data for
    pub terms_no_data: usize,

    /// Terms that failed or timed out
    pub terms_failed: usize,

    /// Every breakout from every category, in detection order
    pub events: Vec<BreakoutEvent>,
}

impl CycleSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration: Duration::ZERO,
            batch_sizes: Vec::new(),
            categories_scanned: 0,
            categories_failed: 0,
            terms_scanned: 0,
            terms_no_data: 0,
            terms_failed: 0,
            events: Vec::new(),
        }
    }

    /// Number of batches the cycle ran
    pub fn batches(&self) -> usize {
        self.batch_sizes.len()
    }

    /// Fold one category's outcome into the cycle totals
    fn absorb(&mut self, outcome: CategoryOutcome) {
        self.categories_scanned += 1;
        if outcome.all_failed() {
            self.categories_failed += 1;
        }
        self.terms_scanned += outcome.terms_scanned;
        self.terms_no_data += outcome.no_data;
        self.terms_failed += outcome.failed;
        self.events.extend(outcome.events);
    }
}

/// Scheduler driving the scanner over the catalog
pub struct BatchScheduler {
    ctx: ScannerContext,
    catalog: Catalog,
    phase: Mutex<ScanPhase>,
}

impl BatchScheduler {
    /// Create a scheduler for a context and catalog
    pub fn new(ctx: ScannerContext, catalog: Catalog) -> Self {
        Self {
            ctx,
            catalog,
            phase: Mutex::new(ScanPhase::Idle),
        }
    }

    /// The scanner context
    pub fn context(&self) -> &ScannerContext {
        &self.ctx
    }

    /// Current scheduler phase
    pub fn phase(&self) -> ScanPhase {
        *self.phase.lock().expect("phase lock poisoned")
    }

    fn set_phase(&self, next: ScanPhase) {
        let mut phase = self.phase.lock().expect("phase lock poisoned");
        if *phase != next {
            tracing::info!(from = %phase, to = %next, "Scheduler phase change");
            *phase = next;
        }
    }

    /// Run one full catalog traversal
    ///
    /// A batch ends once its wall-clock ceiling is reached; the category in
    /// flight always completes. Every category lands in exactly one batch.
    pub async fn run_cycle(&self) -> CycleSummary {
        let started_at = Utc::now();
        let cycle_start = tokio::time::Instant::now();
        let mut summary = CycleSummary::new(started_at);

        let ceiling = self.ctx.config().batch_ceiling();
        let total = self.catalog.len();
        let mut batch_start = tokio::time::Instant::now();
        let mut batch_size = 0usize;

        self.set_phase(ScanPhase::Batching);

        for (index, category) in self.catalog.categories.iter().enumerate() {
            if batch_size > 0 && batch_start.elapsed() >= ceiling {
                tracing::info!(
                    batch = summary.batch_sizes.len() + 1,
                    categories = batch_size,
                    elapsed_secs = batch_start.elapsed().as_secs(),
                    "Batch ceiling reached"
                );
                summary.batch_sizes.push(batch_size);
                batch_size = 0;

                self.rest_between_batches(index, total).await;
                batch_start = tokio::time::Instant::now();
            }

            let outcome = self.ctx.scan_category(category).await;
            batch_size += 1;
            summary.absorb(outcome);

            // Scanning heartbeat
            tracing::info!(
                completed = index + 1,
                total = total,
                breakouts = summary.events.len(),
                elapsed_secs = cycle_start.elapsed().as_secs(),
                limiter_429s = self.ctx.limiter().snapshot().consecutive_429s,
                "Scan progress"
            );
        }

        if batch_size > 0 {
            summary.batch_sizes.push(batch_size);
        }

        summary.duration = cycle_start.elapsed();
        self.set_phase(ScanPhase::CycleComplete);

        self.ctx.dispatcher().dispatch_cycle_summary(&summary).await;

        summary
    }

    /// Unconditional rest between batches, with heartbeats
    async fn rest_between_batches(&self, completed: usize, total: usize) {
        self.set_phase(ScanPhase::Resting);

        let rest = self.ctx.config().rest_period();
        let heartbeat =
            Duration::from_secs(self.ctx.config().scheduler.rest_heartbeat_secs.max(1));

        let rest_start = tokio::time::Instant::now();
        loop {
            let remaining = rest.saturating_sub(rest_start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(heartbeat.min(remaining)).await;
            tracing::info!(
                completed = completed,
                total = total,
                rested_secs = rest_start.elapsed().as_secs(),
                "Resting between batches"
            );
        }

        self.set_phase(ScanPhase::Batching);
    }

    /// Run one cycle, containing anything that escapes it
    ///
    /// Returns `None` when the cycle blew up; the cooldown has already been
    /// applied by the time this returns.
    pub async fn run_cycle_guarded(&self) -> Option<CycleSummary> {
        match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(summary) => Some(summary),
            Err(_) => {
                let cooldown =
                    Duration::from_secs(self.ctx.config().scheduler.cycle_cooldown_secs);
                tracing::error!(
                    cooldown_secs = cooldown.as_secs(),
                    "Scan cycle failed, cooling down before restart"
                );
                self.set_phase(ScanPhase::Idle);
                tokio::time::sleep(cooldown).await;
                None
            }
        }
    }

    /// Drive scan cycles forever on the configured interval
    ///
    /// A failed cycle restarts after the cooldown; a completed cycle is
    /// followed by an idle sleep covering the remainder of the interval,
    /// broken into heartbeat chunks.
    pub async fn run_forever(&self) {
        loop {
            let cycle_start = tokio::time::Instant::now();

            let Some(summary) = self.run_cycle_guarded().await else {
                continue;
            };

            tracing::info!(
                breakouts = summary.events.len(),
                categories = summary.categories_scanned,
                batches = summary.batches(),
                duration_secs = summary.duration.as_secs(),
                "Cycle complete"
            );

            let interval = self.ctx.config().cycle_interval();
            let remaining = interval.saturating_sub(cycle_start.elapsed());
            self.idle_until_next_cycle(remaining).await;
        }
    }

    /// Sleep out the remainder of the cycle interval with heartbeats
    async fn idle_until_next_cycle(&self, remaining: Duration) {
        self.set_phase(ScanPhase::Idle);

        let heartbeat = Duration::from_secs(
            self.ctx.config().scheduler.idle_heartbeat_mins.max(1) * 60,
        );

        let idle_start = tokio::time::Instant::now();
        loop {
            let left = remaining.saturating_sub(idle_start.elapsed());
            if left.is_zero() {
                break;
            }
            tokio::time::sleep(heartbeat.min(left)).await;
            tracing::info!(
                slept_secs = idle_start.elapsed().as_secs(),
                remaining_secs = remaining.saturating_sub(idle_start.elapsed()).as_secs(),
                "Idle heartbeat"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertDispatcher, DeliveryStatus, Messenger, Recipient};
    use crate::catalog::Category;
    use crate::config::Config;
    use crate::detect::BreakoutDetector;
    use crate::error::{ChannelError, FetchError};
    use crate::trends::{InterestSeries, TrendQuery, TrendSource};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Source that takes a fixed simulated duration per fetch
    struct SlowSource {
        per_fetch: Duration,
        calls: AtomicUsize,
        panic_on_call: Option<usize>,
    }

    #[async_trait]
    impl TrendSource for SlowSource {
        async fn fetch(
            &self,
            _query: &TrendQuery,
        ) -> std::result::Result<Option<InterestSeries>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.panic_on_call {
                panic!("injected fault");
            }
            tokio::time::sleep(self.per_fetch).await;
            Ok(None)
        }
    }

    struct NullMessenger;

    #[async_trait]
    impl Messenger for NullMessenger {
        fn name(&self) -> &str {
            "null"
        }

        async fn send(
            &self,
            recipient: &Recipient,
            _text: &str,
        ) -> std::result::Result<DeliveryStatus, ChannelError> {
            Ok(DeliveryStatus::success(self.name(), recipient.normalized_id()))
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.telegram.bot_token = "123:token".into();
        config.telegram.chat_ids = vec!["100".into()];
        config.scanner.term_pause_secs = 0;
        config.scheduler.batch_ceiling_mins = 15;
        config.scheduler.rest_secs = 120;
        config.scheduler.rest_heartbeat_secs = 30;
        config
    }

    fn scheduler(per_fetch_secs: u64, panic_on_call: Option<usize>, categories: usize) -> BatchScheduler {
        let source = SlowSource {
            per_fetch: Duration::from_secs(per_fetch_secs),
            calls: AtomicUsize::new(0),
            panic_on_call,
        };

        let dispatcher = AlertDispatcher::new(
            Box::new(NullMessenger),
            vec![Recipient {
                id: 100,
                group: false,
            }],
        )
        .unwrap();

        let config = test_config();
        let limiter = Arc::new(crate::limiter::AdaptiveLimiter::new(&config.limiter));
        let ctx = ScannerContext::with_parts(
            config,
            limiter,
            Box::new(source),
            BreakoutDetector::default(),
            dispatcher,
        );

        let catalog = Catalog {
            categories: (0..categories)
                .map(|i| Category {
                    name: format!("Category {i}"),
                    terms: (0..6).map(|t| format!("term {i}-{t}")).collect(),
                    symbols: Vec::new(),
                })
                .collect(),
        };

        BatchScheduler::new(ctx, catalog)
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_bounded_and_cover_catalog_exactly_once() {
        // 6 terms x 100s = 10 minutes per category against a 15-minute
        // ceiling: two categories per batch, final partial batch of one
        let sched = scheduler(100, None, 5);

        let summary = sched.run_cycle().await;

        assert_eq!(summary.batch_sizes, vec![2, 2, 1]);
        assert_eq!(summary.batch_sizes.iter().sum::<usize>(), 5);
        assert_eq!(summary.categories_scanned, 5);
        assert_eq!(summary.terms_no_data, 30);
        assert_eq!(sched.phase(), ScanPhase::CycleComplete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_fast_batch() {
        let sched = scheduler(1, None, 3);

        let summary = sched.run_cycle().await;

        assert_eq!(summary.batch_sizes, vec![3]);
        assert_eq!(summary.batches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_duration_includes_rests() {
        let sched = scheduler(100, None, 5);

        let summary = sched.run_cycle().await;

        // Two rests of 120s each sit inside the cycle
        let scan_secs = 5 * 6 * 100;
        assert!(summary.duration >= Duration::from_secs(scan_secs + 240));
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_cycle_contains_panic() {
        let sched = scheduler(1, Some(3), 2);

        let result = sched.run_cycle_guarded().await;
        assert!(result.is_none());
        assert_eq!(sched.phase(), ScanPhase::Idle);

        // The scheduler is still usable after the contained failure
        let sched_ok = scheduler(1, None, 1);
        assert!(sched_ok.run_cycle_guarded().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_cycle_still_dispatches_summary() {
        struct CountingMessenger(Arc<AtomicUsize>);

        #[async_trait]
        impl Messenger for CountingMessenger {
            fn name(&self) -> &str {
                "counting"
            }

            async fn send(
                &self,
                recipient: &Recipient,
                _text: &str,
            ) -> std::result::Result<DeliveryStatus, ChannelError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(DeliveryStatus::success(self.name(), recipient.normalized_id()))
            }
        }

        let sent = Arc::new(AtomicUsize::new(0));
        let dispatcher = AlertDispatcher::new(
            Box::new(CountingMessenger(Arc::clone(&sent))),
            vec![Recipient {
                id: 100,
                group: false,
            }],
        )
        .unwrap();

        let config = test_config();
        let limiter = Arc::new(crate::limiter::AdaptiveLimiter::new(&config.limiter));
        let ctx = ScannerContext::with_parts(
            config,
            limiter,
            Box::new(SlowSource {
                per_fetch: Duration::from_secs(1),
                calls: AtomicUsize::new(0),
                panic_on_call: None,
            }),
            BreakoutDetector::default(),
            dispatcher,
        );

        let catalog = Catalog {
            categories: vec![Category {
                name: "Quiet".into(),
                terms: vec!["nothing here".into()],
                symbols: Vec::new(),
            }],
        };

        let summary = BatchScheduler::new(ctx, catalog).run_cycle().await;

        assert!(summary.events.is_empty());
        // The "no breakouts" summary still went out
        assert_eq!(sent.load(Ordering::SeqCst), 1);
    }
}
