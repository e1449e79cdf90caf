use crate::aggregation::{NightStats, NightlyStats};
use crate::error::Result;
use crate::grouping::NightKey;
use chrono::Duration;
use log::info;
use serde::Serialize;
use std::path::Path;

/// A stage reported in the summary, and optionally charted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedStage {
    pub stage: &'static str,
    pub label: &'static str,
    /// Series color; `None` keeps the stage out of the chart.
    pub color: Option<(u8, u8, u8)>,
}

pub const TRACKED_STAGES: [TrackedStage; 5] = [
    TrackedStage {
        stage: "inBed",
        label: "Bed",
        color: None,
    },
    TrackedStage {
        stage: "asleepCore",
        label: "Core",
        color: Some((0, 255, 0)),
    },
    TrackedStage {
        stage: "asleepREM",
        label: "REM",
        color: Some((255, 0, 255)),
    },
    TrackedStage {
        stage: "asleepDeep",
        label: "Deep",
        color: Some((0, 122, 122)),
    },
    TrackedStage {
        stage: "awake",
        label: "Awake",
        color: Some((128, 128, 128)),
    },
];

/// Charted stages with their series color, in legend order.
pub fn charted_stages() -> impl Iterator<Item = (&'static TrackedStage, (u8, u8, u8))> {
    TRACKED_STAGES
        .iter()
        .filter_map(|s| s.color.map(|color| (s, color)))
}

fn hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 3_600_000.0
}

/// Renders like `7h5m0s`, `30m0s` or `45s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}{}h{}m{}s", sign, h, m, s)
    } else if m > 0 {
        format!("{}{}m{}s", sign, m, s)
    } else {
        format!("{}{}s", sign, s)
    }
}

/// Hours spent in `stage` per night, oldest night first. Absent stages are 0.0.
pub fn stage_series(stats: &NightlyStats, stage: &str) -> Vec<(NightKey, f64)> {
    stats
        .iter()
        .map(|(key, night)| (*key, hours(night.duration(stage))))
        .collect()
}

fn summary_line(key: &NightKey, night: &NightStats, count_stage: &str) -> String {
    let mut line = key.to_string();
    for tracked in TRACKED_STAGES.iter() {
        line.push_str(&format!(
            "\t{}: {}",
            tracked.label,
            format_duration(night.duration(tracked.stage))
        ));
    }

    let count_label = if count_stage == "inBed" {
        "Awake Count".to_string()
    } else {
        format!("{} Count", count_stage)
    };
    line.push_str(&format!("\t{}: {}", count_label, night.session_count));

    // Labels outside the tracked set keep their raw name.
    for (stage, duration) in night.stages() {
        if !TRACKED_STAGES.iter().any(|t| t.stage == stage) {
            line.push_str(&format!("\t{}: {}", stage, format_duration(duration)));
        }
    }
    line
}

/// One line per night, ascending by date.
pub fn summary_lines(stats: &NightlyStats) -> Vec<String> {
    stats
        .iter()
        .map(|(key, night)| summary_line(key, night, stats.count_stage()))
        .collect()
}

pub fn print_summary(stats: &NightlyStats) {
    println!("Sleep Statistics by Date:");
    for line in summary_lines(stats) {
        println!("{}", line);
    }
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    date: NightKey,
    in_bed_hours: f64,
    core_hours: f64,
    rem_hours: f64,
    deep_hours: f64,
    awake_hours: f64,
    session_count: usize,
}

pub fn write_summary_csv(path: &Path, stats: &NightlyStats) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    info!("Writing summary to {}", path.display());
    let mut writer = csv::Writer::from_path(path)?;

    for (key, night) in stats.iter() {
        writer.serialize(SummaryRow {
            date: *key,
            in_bed_hours: hours(night.duration("inBed")),
            core_hours: hours(night.duration("asleepCore")),
            rem_hours: hours(night.duration("asleepREM")),
            deep_hours: hours(night.duration("asleepDeep")),
            awake_hours: hours(night.duration("awake")),
            session_count: night.session_count,
        })?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{nightly_stats, BoundaryPolicy, SleepInterval};
    use chrono::{TimeZone, Utc};

    fn interval(day: u32, hour: u32, minutes: i64, stage: &str) -> SleepInterval {
        let start = Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap();
        SleepInterval::new(start, start + Duration::minutes(minutes), stage).unwrap()
    }

    fn stats() -> NightlyStats {
        stats_counting("inBed")
    }

    fn stats_counting(count_stage: &str) -> NightlyStats {
        nightly_stats(
            vec![
                interval(5, 22, 60, "asleepCore"),
                interval(2, 23, 120, "asleepCore"),
                interval(2, 22, 30, "inBed"),
                interval(3, 1, 30, "awake"),
                interval(3, 2, 10, "asleepUnspecified"),
            ],
            BoundaryPolicy::AsIs,
            count_stage,
        )
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::hours(2)), "2h0m0s");
        assert_eq!(format_duration(Duration::minutes(30)), "30m0s");
        assert_eq!(format_duration(Duration::seconds(4 * 3600 + 5 * 60 + 9)), "4h5m9s");
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::zero()), "0s");
    }

    #[test]
    fn test_series_ascending_with_zero_default() {
        let series = stage_series(&stats(), "asleepCore");
        let dates: Vec<String> = series.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-03", "2024-01-05"]);
        assert_eq!(series[0].1, 2.0);
        assert_eq!(series[1].1, 0.0);
        assert_eq!(series[2].1, 1.0);
    }

    #[test]
    fn test_summary_lines_sorted_unique() {
        let lines = summary_lines(&stats());
        let dates: Vec<&str> = lines.iter().map(|l| &l[..10]).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(dates, sorted);
        assert_eq!(dates.len(), 3);
    }

    #[test]
    fn test_summary_line_format() {
        let lines = summary_lines(&stats());
        assert_eq!(
            lines[0],
            "2024-01-02\tBed: 30m0s\tCore: 2h0m0s\tREM: 0s\tDeep: 0s\tAwake: 0s\tAwake Count: 1"
        );
        assert_eq!(
            lines[1],
            "2024-01-03\tBed: 0s\tCore: 0s\tREM: 0s\tDeep: 0s\tAwake: 30m0s\tAwake Count: 0\tasleepUnspecified: 10m0s"
        );
    }

    #[test]
    fn test_custom_count_stage_label() {
        let lines = summary_lines(&stats_counting("awake"));
        assert!(lines[0].ends_with("\tawake Count: 0"));
        assert!(lines[1].contains("\tawake Count: 1"));
        assert!(!lines[1].contains("Awake Count"));
    }

    #[test]
    fn test_in_bed_tracked_but_not_charted() {
        let charted: Vec<&str> = charted_stages().map(|(s, _)| s.stage).collect();
        assert_eq!(charted, vec!["asleepCore", "asleepREM", "asleepDeep", "awake"]);
        assert!(TRACKED_STAGES.iter().any(|s| s.stage == "inBed" && s.color.is_none()));
    }

    #[test]
    fn test_empty_stats() {
        let empty = NightlyStats::default();
        assert!(summary_lines(&empty).is_empty());
        assert!(stage_series(&empty, "awake").is_empty());
    }

    #[test]
    fn test_write_summary_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.csv");
        write_summary_csv(&path, &stats()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,in_bed_hours,core_hours,rem_hours,deep_hours,awake_hours,session_count"
        );
        assert_eq!(lines.next().unwrap(), "2024-01-02,0.5,2.0,0.0,0.0,0.0,1");
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_write_summary_csv_under_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = write_summary_csv(&blocker.join("summary.csv"), &stats()).unwrap_err();
        assert!(matches!(err, crate::SleepStatsError::Io(_)));
    }
}
