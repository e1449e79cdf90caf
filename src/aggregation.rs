use crate::grouping::{NightBuckets, NightKey};
use crate::SleepInterval;
use chrono::Duration;
use std::collections::BTreeMap;

/// Stage totals for one night.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightStats {
    stages: BTreeMap<String, Duration>,
    /// Occurrences of the designated count stage, a proxy for interruptions.
    pub session_count: usize,
}

impl NightStats {
    /// Folds one interval into the totals.
    pub fn with_interval(mut self, interval: &SleepInterval, count_stage: &str) -> Self {
        let total = self
            .stages
            .entry(interval.stage.clone())
            .or_insert_with(Duration::zero);
        *total += interval.duration();
        if interval.stage == count_stage {
            self.session_count += 1;
        }
        self
    }

    /// Combines two partial results for the same night.
    pub fn merge(mut self, other: NightStats) -> Self {
        for (stage, duration) in other.stages {
            *self.stages.entry(stage).or_insert_with(Duration::zero) += duration;
        }
        self.session_count += other.session_count;
        self
    }

    /// Accumulated time in `stage`; zero when the stage never occurred.
    pub fn duration(&self, stage: &str) -> Duration {
        self.stages.get(stage).copied().unwrap_or_else(Duration::zero)
    }

    pub fn total(&self) -> Duration {
        self.stages
            .values()
            .fold(Duration::zero(), |acc, d| acc + *d)
    }

    /// Stage labels seen this night, sorted.
    pub fn stages(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.stages.iter().map(|(s, d)| (s.as_str(), *d))
    }
}

/// Per-night stage totals, keyed in calendar order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightlyStats {
    nights: BTreeMap<NightKey, NightStats>,
    count_stage: String,
}

impl NightlyStats {
    /// Stage whose occurrences `NightStats::session_count` holds.
    pub fn count_stage(&self) -> &str {
        &self.count_stage
    }

    pub fn len(&self) -> usize {
        self.nights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nights.is_empty()
    }

    pub fn get(&self, key: &NightKey) -> Option<&NightStats> {
        self.nights.get(key)
    }

    /// Nights in ascending calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (&NightKey, &NightStats)> {
        self.nights.iter()
    }
}

pub fn aggregate_night(intervals: &[SleepInterval], count_stage: &str) -> NightStats {
    intervals
        .iter()
        .fold(NightStats::default(), |stats, interval| {
            stats.with_interval(interval, count_stage)
        })
}

pub fn aggregate_nights(buckets: &NightBuckets, count_stage: &str) -> NightlyStats {
    let nights = buckets
        .iter()
        .map(|(key, intervals)| (*key, aggregate_night(intervals, count_stage)))
        .collect();
    NightlyStats {
        nights,
        count_stage: count_stage.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::{group_by_night, BoundaryPolicy};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn interval(day: u32, hour: u32, minute: u32, minutes: i64, stage: &str) -> SleepInterval {
        let start = Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap();
        SleepInterval::new(start, start + Duration::minutes(minutes), stage).unwrap()
    }

    fn sample() -> Vec<SleepInterval> {
        vec![
            interval(1, 22, 0, 30, "inBed"),
            interval(1, 22, 30, 90, "asleepCore"),
            interval(1, 23, 0, 20, "asleepDeep"),
            interval(2, 0, 0, 25, "asleepREM"),
            interval(2, 0, 25, 5, "awake"),
            interval(2, 0, 30, 60, "inBed"),
            interval(2, 1, 30, 10, "asleepUnspecified"),
            interval(2, 22, 0, 45, "asleepCore"),
            interval(2, 22, 0, 45, "asleepCore"),
            interval(2, 23, 0, 15, "inBed"),
        ]
    }

    #[test]
    fn test_durations_sum_per_stage() {
        let stats = aggregate_night(&sample()[..3], "inBed");
        assert_eq!(stats.duration("inBed"), Duration::minutes(30));
        assert_eq!(stats.duration("asleepCore"), Duration::minutes(90));
        assert_eq!(stats.duration("asleepDeep"), Duration::minutes(20));
        assert_eq!(stats.session_count, 1);
    }

    #[test]
    fn test_missing_stage_is_zero() {
        let stats = aggregate_night(&sample()[..1], "inBed");
        assert_eq!(stats.duration("asleepREM"), Duration::zero());
    }

    #[test]
    fn test_unknown_stage_gets_own_bucket() {
        let stats = aggregate_night(&sample(), "inBed");
        assert_eq!(stats.duration("asleepUnspecified"), Duration::minutes(10));
    }

    #[test]
    fn test_duplicates_are_counted() {
        let stats = aggregate_night(&sample()[7..9], "inBed");
        assert_eq!(stats.duration("asleepCore"), Duration::minutes(90));
    }

    #[test]
    fn test_conservation_per_night() {
        let buckets = group_by_night(sample(), BoundaryPolicy::AsIs);
        let nightly = aggregate_nights(&buckets, "inBed");

        assert_eq!(nightly.len(), buckets.len());
        for (key, intervals) in buckets.iter() {
            let expected = intervals
                .iter()
                .fold(Duration::zero(), |acc, i| acc + (i.end - i.start));
            assert_eq!(nightly.get(key).unwrap().total(), expected, "night {}", key);
        }
    }

    #[test]
    fn test_order_independent() {
        let forward = aggregate_night(&sample(), "inBed");
        let mut reversed = sample();
        reversed.reverse();
        assert_eq!(aggregate_night(&reversed, "inBed"), forward);

        let mut rotated = sample();
        rotated.rotate_left(4);
        assert_eq!(aggregate_night(&rotated, "inBed"), forward);
    }

    #[test]
    fn test_merge_matches_single_fold() {
        let all = sample();
        let (left, right) = all.split_at(4);
        let merged = aggregate_night(left, "inBed").merge(aggregate_night(right, "inBed"));
        assert_eq!(merged, aggregate_night(&all, "inBed"));
    }

    #[test]
    fn test_session_count_per_night() {
        let buckets = group_by_night(sample(), BoundaryPolicy::AsIs);
        let nightly = aggregate_nights(&buckets, "inBed");
        let first = NightKey::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let second = NightKey::new(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(nightly.get(&first).unwrap().session_count, 1);
        assert_eq!(nightly.get(&second).unwrap().session_count, 2);
    }

    #[test]
    fn test_count_stage_recorded() {
        let buckets = group_by_night(sample(), BoundaryPolicy::AsIs);
        let nightly = aggregate_nights(&buckets, "awake");
        let second = NightKey::new(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
        assert_eq!(nightly.count_stage(), "awake");
        assert_eq!(nightly.get(&second).unwrap().session_count, 1);
    }

    #[test]
    fn test_empty_buckets() {
        let nightly = aggregate_nights(&NightBuckets::default(), "inBed");
        assert!(nightly.is_empty());
    }
}
