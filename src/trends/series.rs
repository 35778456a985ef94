//! Interest time series returned by the provider
//!
//! A series is produced fresh per fetch, covers one term and one geography,
//! and is immutable once returned. Values are provider-normalized interest
//! scores in [0, 100]; anything outside that range is a provider fault and
//! is rejected at decode time, never stored.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::FetchError;

/// One (timestamp, value) observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterestPoint {
    /// Observation timestamp (daily resolution from the provider)
    pub timestamp: DateTime<Utc>,

    /// Interest score in [0, 100]
    pub value: f64,
}

impl InterestPoint {
    /// Calendar date of this observation
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Ordered interest series for one term and one geography
#[derive(Debug, Clone)]
pub struct InterestSeries {
    term: String,
    geo: String,
    points: Vec<InterestPoint>,

    /// True when the requested end day had no data and the series ends on
    /// the most recent prior day instead (provider reporting lag)
    stale_latest: bool,
}

impl InterestSeries {
    /// Build a series from decoded points, validating values and ordering
    ///
    /// `window_end` is the requested end of the query window; a series whose
    /// last observation falls before it is flagged `stale_latest` so callers
    /// know which day the latest value represents.
    pub fn from_points(
        term: impl Into<String>,
        geo: impl Into<String>,
        points: Vec<InterestPoint>,
        window_end: NaiveDate,
    ) -> Result<Self, FetchError> {
        for point in &points {
            if !(0.0..=100.0).contains(&point.value) || !point.value.is_finite() {
                return Err(FetchError::Decode(format!(
                    "interest value {} out of range [0, 100]",
                    point.value
                )));
            }
        }

        if points.windows(2).any(|w| w[0].timestamp > w[1].timestamp) {
            return Err(FetchError::Decode(
                "timeline points out of chronological order".into(),
            ));
        }

        let stale_latest = points
            .last()
            .map(|p| p.date() < window_end)
            .unwrap_or(false);

        Ok(Self {
            term: term.into(),
            geo: geo.into(),
            points,
            stale_latest,
        })
    }

    /// The search term this series describes
    pub fn term(&self) -> &str {
        &self.term
    }

    /// The geography restriction this series was fetched with
    pub fn geo(&self) -> &str {
        &self.geo
    }

    /// All observations, oldest first
    pub fn points(&self) -> &[InterestPoint] {
        &self.points
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series holds no observations
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the latest observation predates the requested window end
    pub fn stale_latest(&self) -> bool {
        self.stale_latest
    }

    /// The most recent observation
    pub fn latest(&self) -> Option<&InterestPoint> {
        self.points.last()
    }

    /// The observation with the maximum value (earliest on ties)
    pub fn peak(&self) -> Option<&InterestPoint> {
        self.points
            .iter()
            .reduce(|best, p| if p.value > best.value { p } else { best })
    }

    /// Values only, oldest first
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, n, 0, 0, 0).unwrap()
    }

    fn points(values: &[f64]) -> Vec<InterestPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| InterestPoint {
                timestamp: day(1 + i as u32),
                value,
            })
            .collect()
    }

    #[test]
    fn test_series_basics() {
        let series = InterestSeries::from_points(
            "web3",
            "US",
            points(&[10.0, 20.0, 95.0, 30.0]),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(),
        )
        .unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.term(), "web3");
        assert!(!series.stale_latest());
        assert_eq!(series.peak().unwrap().value, 95.0);
        assert_eq!(series.peak().unwrap().date().day(), 3);
        assert_eq!(series.latest().unwrap().value, 30.0);
    }

    #[test]
    fn test_out_of_range_value_rejected() {
        let result = InterestSeries::from_points(
            "web3",
            "US",
            points(&[10.0, 250.0]),
            NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
        );
        assert!(matches!(result, Err(FetchError::Decode(_))));

        let result = InterestSeries::from_points(
            "web3",
            "US",
            points(&[-1.0]),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        );
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_stale_latest_flagged_on_missing_today() {
        // Window ends on the 6th but the data stops on the 4th
        let series = InterestSeries::from_points(
            "web3",
            "US",
            points(&[10.0, 20.0, 30.0, 40.0]),
            NaiveDate::from_ymd_opt(2025, 3, 6).unwrap(),
        )
        .unwrap();

        assert!(series.stale_latest());
        assert_eq!(series.latest().unwrap().date().day(), 4);
    }

    #[test]
    fn test_unordered_points_rejected() {
        let mut pts = points(&[10.0, 20.0]);
        pts.swap(0, 1);
        let result = InterestSeries::from_points(
            "web3",
            "US",
            pts,
            NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
        );
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_peak_prefers_earliest_on_tie() {
        let series = InterestSeries::from_points(
            "web3",
            "US",
            points(&[90.0, 50.0, 90.0]),
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        )
        .unwrap();

        assert_eq!(series.peak().unwrap().date().day(), 1);
    }
}
