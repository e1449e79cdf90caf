use crate::SleepInterval;
use chrono::{Days, NaiveDate, NaiveTime, Timelike};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Calendar date a night is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NightKey(NaiveDate);

impl NightKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Seconds since the epoch at midnight UTC of this night's date.
    pub fn epoch_seconds(&self) -> i64 {
        self.0.and_time(NaiveTime::MIN).and_utc().timestamp()
    }
}

impl fmt::Display for NightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// How an interval's start time maps onto a night.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoundaryPolicy {
    /// Date of the start timestamp, unchanged. Assumes zone-normalized input.
    #[default]
    AsIs,
    /// Starts before noon belong to the previous day's night.
    ShiftBeforeNoon,
}

impl FromStr for BoundaryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "as-is" => Ok(BoundaryPolicy::AsIs),
            "shift-before-noon" => Ok(BoundaryPolicy::ShiftBeforeNoon),
            _ => Err(format!(
                "Invalid boundary policy: {}. Use as-is (default) or shift-before-noon",
                s
            )),
        }
    }
}

impl BoundaryPolicy {
    pub fn night_key(&self, interval: &SleepInterval) -> NightKey {
        let date = interval.start.date_naive();
        match self {
            BoundaryPolicy::AsIs => NightKey(date),
            BoundaryPolicy::ShiftBeforeNoon if interval.start.hour() < 12 => {
                NightKey(date.checked_sub_days(Days::new(1)).unwrap_or(date))
            }
            BoundaryPolicy::ShiftBeforeNoon => NightKey(date),
        }
    }
}

/// Intervals filed by night. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct NightBuckets {
    nights: BTreeMap<NightKey, Vec<SleepInterval>>,
}

impl NightBuckets {
    pub fn len(&self) -> usize {
        self.nights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nights.is_empty()
    }

    pub fn get(&self, key: &NightKey) -> Option<&[SleepInterval]> {
        self.nights.get(key).map(Vec::as_slice)
    }

    /// Nights in ascending calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (&NightKey, &[SleepInterval])> {
        self.nights.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn interval_count(&self) -> usize {
        self.nights.values().map(Vec::len).sum()
    }
}

pub fn group_by_night(intervals: Vec<SleepInterval>, policy: BoundaryPolicy) -> NightBuckets {
    let total = intervals.len();
    let nights = intervals
        .into_iter()
        .fold(BTreeMap::new(), |mut nights: BTreeMap<NightKey, Vec<SleepInterval>>, interval| {
            nights
                .entry(policy.night_key(&interval))
                .or_default()
                .push(interval);
            nights
        });

    debug!(
        "Grouped {} intervals into {} nights ({:?})",
        total,
        nights.len(),
        policy
    );

    NightBuckets { nights }
}
