//! Breakout detection over interest series
//!
//! A breakout is a statistically and absolutely significant spike in interest
//! relative to the term's own recent baseline. The rule is multi-condition:
//! an absolute floor, a genuine-new-high requirement, and a dual path that
//! catches both huge jumps from a low baseline and statistically extreme but
//! proportionally smaller jumps from a higher one. A trailing-average guard
//! suppresses alerts for series that were already elevated.
//!
//! The baseline always excludes the observation(s) under test so the spike
//! cannot inflate its own reference mean.

use chrono::{DateTime, Utc};
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::trends::InterestSeries;

/// Detection thresholds
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Minimum observations required for a statistical basis
    pub min_points: usize,

    /// Most recent observations excluded from the baseline
    pub recent_excluded: usize,

    /// Absolute interest floor for the peak
    pub peak_floor: f64,

    /// Path 1: peak must reach this multiple of the baseline mean
    pub baseline_ratio: f64,

    /// Path 2: z-score threshold
    pub z_threshold: f64,

    /// Path 2: peak must also reach this multiple of the baseline max
    pub new_high_ratio: f64,

    /// Trailing sub-window length for the stale-momentum guard, in points
    pub momentum_window: usize,

    /// Guard fires when the trailing average exceeds this multiple of the
    /// baseline mean
    pub momentum_ratio: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_points: 30,
            recent_excluded: 1,
            peak_floor: 90.0,
            baseline_ratio: 2.5,
            z_threshold: 3.0,
            new_high_ratio: 1.3,
            momentum_window: 7,
            momentum_ratio: 1.5,
        }
    }
}

/// Rolling statistics over the baseline portion of a series
///
/// Recomputed on every detection call, never cached across terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineStats {
    /// Baseline mean
    pub mean: f64,

    /// Baseline sample standard deviation (0 for constant series)
    pub std_dev: f64,

    /// Baseline maximum
    pub max: f64,
}

impl BaselineStats {
    /// Compute statistics over a baseline slice
    pub fn compute(baseline: &[f64]) -> Self {
        let mean = baseline.mean();
        let std_dev = baseline.std_dev();
        let max = baseline.iter().copied().fold(f64::MIN, f64::max);

        Self {
            mean,
            // std_dev is NaN for fewer than two points; treat as no spread
            std_dev: if std_dev.is_finite() { std_dev } else { 0.0 },
            max,
        }
    }

    /// Z-score of `value` against this baseline; exactly 0 when the
    /// baseline has no spread, never NaN
    pub fn z_score(&self, value: f64) -> f64 {
        if self.std_dev == 0.0 {
            0.0
        } else {
            (value - self.mean) / self.std_dev
        }
    }
}

/// A detected breakout, ready for alert formatting
#[derive(Debug, Clone, Serialize)]
pub struct BreakoutEvent {
    /// Search term that spiked
    pub term: String,

    /// Category the term belongs to
    pub category: String,

    /// Peak interest value
    pub peak: f64,

    /// When the peak was observed
    pub peak_time: DateTime<Utc>,

    /// Baseline average the peak is measured against
    pub baseline_avg: f64,

    /// Z-score of the peak against the baseline
    pub z_score: f64,

    /// True when the series' latest observation predates the requested
    /// window end (provider reporting lag)
    pub stale_latest: bool,
}

impl BreakoutEvent {
    /// Percentage increase of the peak over the baseline average
    ///
    /// `None` when the baseline average is zero or negative.
    pub fn percent_increase(&self) -> Option<f64> {
        if self.baseline_avg > 0.0 {
            Some((self.peak - self.baseline_avg) / self.baseline_avg * 100.0)
        } else {
            None
        }
    }
}

/// Breakout detector applying the multi-condition rule
#[derive(Debug, Clone, Default)]
pub struct BreakoutDetector {
    config: DetectorConfig,
}

impl BreakoutDetector {
    /// Create a detector with custom thresholds
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Evaluate a series; `Some` when the breakout rule fires
    ///
    /// Comparisons use closed lower bounds throughout. Series shorter than
    /// the minimum lookback never fire.
    pub fn evaluate(
        &self,
        series: &InterestSeries,
        term: &str,
        category: &str,
    ) -> Option<BreakoutEvent> {
        let cfg = &self.config;

        // Cheapest check first: the absolute floor
        let peak = series.peak()?;
        if peak.value < cfg.peak_floor {
            return None;
        }

        if series.len() < cfg.min_points {
            return None;
        }

        let values: Vec<f64> = series.values().collect();
        let baseline = &values[..values.len() - cfg.recent_excluded.min(values.len() - 1)];
        let stats = BaselineStats::compute(baseline);
        let z = stats.z_score(peak.value);

        // A plateau touching an old high is not a breakout
        if peak.value <= stats.max {
            return None;
        }

        let low_baseline_jump = peak.value >= cfg.baseline_ratio * stats.mean;
        let statistical_extreme =
            z >= cfg.z_threshold && peak.value >= cfg.new_high_ratio * stats.max;

        if !(low_baseline_jump || statistical_extreme) {
            return None;
        }

        // Stale momentum: a series that was already elevated over its
        // trailing window is old news, not a fresh spike
        let window = cfg.momentum_window.min(baseline.len());
        if window > 0 {
            let trailing = &baseline[baseline.len() - window..];
            if trailing.mean() > cfg.momentum_ratio * stats.mean {
                return None;
            }
        }

        Some(BreakoutEvent {
            term: term.to_string(),
            category: category.to_string(),
            peak: peak.value,
            peak_time: peak.timestamp,
            baseline_avg: stats.mean,
            z_score: z,
            stale_latest: series.stale_latest(),
        })
    }
}
