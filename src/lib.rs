pub mod aggregation;
pub mod chart;
pub mod config;
pub mod data_loading;
pub mod error;
pub mod grouping;
pub mod output;
pub mod trend;

use chrono::{DateTime, Duration, Utc};

pub use aggregation::{aggregate_nights, NightStats, NightlyStats};
pub use error::{Result, SleepStatsError};
pub use grouping::{group_by_night, BoundaryPolicy, NightBuckets, NightKey};

/// One stage segment of a sleep session, as recorded by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub stage: String,
}

impl SleepInterval {
    /// Returns `None` when `end` precedes `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, stage: impl Into<String>) -> Option<Self> {
        if end < start {
            return None;
        }
        Some(Self {
            start,
            end,
            stage: stage.into(),
        })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Runs grouping and aggregation over already parsed intervals.
pub fn nightly_stats(
    intervals: Vec<SleepInterval>,
    policy: BoundaryPolicy,
    count_stage: &str,
) -> NightlyStats {
    let buckets = group_by_night(intervals, policy);
    aggregate_nights(&buckets, count_stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_inverted_interval_rejected() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert!(SleepInterval::new(start, end, "awake").is_none());
    }

    #[test]
    fn test_zero_length_interval_allowed() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap();
        let interval = SleepInterval::new(at, at, "awake").unwrap();
        assert_eq!(interval.duration(), Duration::zero());
    }
}
