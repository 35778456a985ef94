//! Adaptive rate limiting for the trend provider
//!
//! The provider's rate limit is global to the API key/IP, so a single
//! sequential limiter gates every outbound call. Two layers cooperate here:
//! a `governor` quota enforcing the hard per-minute request budget, and an
//! adaptive delay that self-tunes toward the fastest sustainable polling
//! rate — rising on each 429 signal, decaying back toward the floor after a
//! clean window.
//!
//! The state transitions live in [`LimiterState`], a plain struct driven by
//! explicit clock values so they can be tested without sleeping.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use rand::Rng;
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::LimiterConfig;

/// Length of the rolling request window
const WINDOW: Duration = Duration::from_secs(60);

/// Mutable limiter counters, advanced by explicit clock values
///
/// Counters reset only at window boundaries; the consecutive-failure count
/// never goes negative.
#[derive(Debug)]
pub struct LimiterState {
    /// Start of the current rolling window
    window_start: Instant,

    /// Requests permitted in the current window
    requests_in_window: u32,

    /// Rate-limit signals in the current window
    failures_in_window: u32,

    /// Consecutive rate-limit signals, decayed one per clean window
    consecutive_429s: u32,

    /// Current adaptive base delay
    base_delay: Duration,

    /// Timestamp of the last permitted request
    last_request: Option<Instant>,

    floor: Duration,
    ceiling: Duration,
    increment: Duration,
}

impl LimiterState {
    /// Create state with the configured floor as the starting delay
    pub fn new(config: &LimiterConfig, now: Instant) -> Self {
        let floor = Duration::from_secs(config.base_delay_floor_secs);
        Self {
            window_start: now,
            requests_in_window: 0,
            failures_in_window: 0,
            consecutive_429s: 0,
            base_delay: floor,
            last_request: None,
            floor,
            ceiling: Duration::from_secs(config.base_delay_ceiling_secs),
            increment: Duration::from_secs(config.delay_increment_secs),
        }
    }

    /// Advance past any completed windows
    ///
    /// Each completed window resets the in-window counters and decays the
    /// consecutive-failure count by one. A window with zero failures also
    /// steps the base delay back down toward the floor.
    pub fn roll_window(&mut self, now: Instant) {
        while now.duration_since(self.window_start) >= WINDOW {
            if self.failures_in_window == 0 {
                self.base_delay = self.base_delay.saturating_sub(self.increment).max(self.floor);
            }
            self.consecutive_429s = self.consecutive_429s.saturating_sub(1);
            self.requests_in_window = 0;
            self.failures_in_window = 0;
            self.window_start += WINDOW;
        }
    }

    /// Delay to apply before the next call, scaled by consecutive failures
    pub fn current_delay(&self) -> Duration {
        self.base_delay * (1 + self.consecutive_429s)
    }

    /// Record a permitted request
    pub fn record_request(&mut self, now: Instant) {
        self.requests_in_window += 1;
        self.last_request = Some(now);
    }

    /// Record a rate-limit signal from the provider
    pub fn record_rate_limited(&mut self) {
        self.consecutive_429s += 1;
        self.failures_in_window += 1;
        self.base_delay = (self.base_delay + self.increment).min(self.ceiling);
    }

    /// Current adaptive base delay
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Consecutive rate-limit signals
    pub fn consecutive_429s(&self) -> u32 {
        self.consecutive_429s
    }

    /// Requests permitted in the current window
    pub fn requests_in_window(&self) -> u32 {
        self.requests_in_window
    }
}

/// Snapshot of limiter counters for heartbeat logging
#[derive(Debug, Clone, Copy)]
pub struct LimiterSnapshot {
    pub requests_in_window: u32,
    pub consecutive_429s: u32,
    pub base_delay: Duration,
}

/// Adaptive limiter gating every call to the trend provider
pub struct AdaptiveLimiter {
    /// Hard per-minute request budget
    quota: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Adaptive counters
    state: Mutex<LimiterState>,

    /// Cooldown slept after a rate-limit signal
    cooldown: Duration,
}

impl AdaptiveLimiter {
    /// Create a limiter from configuration
    pub fn new(config: &LimiterConfig) -> Self {
        let per_minute =
            NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::new(1).unwrap());
        let quota = RateLimiter::direct(Quota::per_minute(per_minute));

        Self {
            quota,
            state: Mutex::new(LimiterState::new(config, Instant::now())),
            cooldown: Duration::from_secs(config.cooldown_secs),
        }
    }

    /// Wait, then permit one outbound call
    ///
    /// Sleeps a jittered duration in `[delay, 1.5 * delay]` before waiting on
    /// the per-minute quota. Never drops a call.
    pub async fn acquire(&self) {
        let delay = {
            let mut state = self.state.lock().expect("limiter state poisoned");
            state.roll_window(Instant::now());
            state.current_delay()
        };

        let jittered = jitter(delay);
        tracing::debug!(
            delay_ms = jittered.as_millis() as u64,
            "Waiting before trend request"
        );
        tokio::time::sleep(jittered).await;

        self.quota.until_ready().await;

        let mut state = self.state.lock().expect("limiter state poisoned");
        state.record_request(Instant::now());
    }

    /// React to a provider rate-limit signal
    ///
    /// Raises the base delay, then sleeps the fixed cooldown. The caller
    /// still owns the error and its retry count.
    pub async fn on_rate_limited(&self) {
        let (base_delay, consecutive) = {
            let mut state = self.state.lock().expect("limiter state poisoned");
            state.record_rate_limited();
            (state.base_delay(), state.consecutive_429s())
        };

        tracing::warn!(
            consecutive_429s = consecutive,
            base_delay_secs = base_delay.as_secs(),
            cooldown_secs = self.cooldown.as_secs(),
            "Provider rate limit hit, cooling down"
        );
        tokio::time::sleep(self.cooldown).await;
    }

    /// Snapshot the current counters
    pub fn snapshot(&self) -> LimiterSnapshot {
        let state = self.state.lock().expect("limiter state poisoned");
        LimiterSnapshot {
            requests_in_window: state.requests_in_window(),
            consecutive_429s: state.consecutive_429s(),
            base_delay: state.base_delay(),
        }
    }
}

/// Uniformly random duration in `[delay, 1.5 * delay]`
fn jitter(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let factor = rand::thread_rng().gen_range(1.0..=1.5);
    delay.mul_f64(factor)
}
