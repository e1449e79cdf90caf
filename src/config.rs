use crate::chart::{AxisScale, ChartOptions, MarkerStyle};
use crate::data_loading::{ColumnNames, DateRange, ParseOptions};
use crate::error::{Result, SleepStatsError};
use crate::grouping::BoundaryPolicy;
use crate::trend::DEFAULT_ZERO_FLOOR;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date format: {} ({}). Use YYYY-MM-DD", s, e))
}

fn parse_floor(s: &str) -> std::result::Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v > 0.0 && v.is_finite() => Ok(v),
        _ => Err(format!("Invalid zero floor: {}. Must be a positive number", s)),
    }
}

/// Chart and summarize nightly sleep stages from a health export
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// CSV file containing sleep data
    #[arg(long, env = "SLEEP_STATS_FILE")]
    pub file: PathBuf,

    /// Start date (inclusive) in YYYY-MM-DD format
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// End date (inclusive) in YYYY-MM-DD format
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Plot with lines instead of points
    #[arg(long)]
    pub lines: bool,

    /// Night boundary rule (as-is or shift-before-noon)
    #[arg(long, default_value = "as-is")]
    pub boundary: BoundaryPolicy,

    /// Duration axis scale (log or linear)
    #[arg(long, default_value = "log")]
    pub scale: AxisScale,

    /// Only rows whose device column starts with this prefix are used
    #[arg(long, default_value = "Watch")]
    pub device_prefix: String,

    /// Stage whose segments are counted per night
    #[arg(long, default_value = "inBed")]
    pub count_stage: String,

    /// Value plotted in place of zero durations, in hours
    #[arg(long, default_value_t = DEFAULT_ZERO_FLOOR, value_parser = parse_floor)]
    pub zero_floor: f64,

    /// Header of the device class column
    #[arg(long, default_value = "productType")]
    pub device_column: String,

    /// Header of the start timestamp column
    #[arg(long, default_value = "startDate")]
    pub start_column: String,

    /// Header of the end timestamp column
    #[arg(long, default_value = "endDate")]
    pub end_column: String,

    /// Header of the sleep stage column
    #[arg(long, default_value = "value")]
    pub stage_column: String,

    /// Chart output path
    #[arg(long, default_value = "sleep_statistics.svg")]
    pub chart_output: PathBuf,

    /// Optional CSV file receiving the nightly summary
    #[arg(long)]
    pub csv_output: Option<PathBuf>,
}

impl Args {
    /// Checks constraints that span several flags.
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(SleepStatsError::Usage(format!(
                    "Start date {} is after end date {}",
                    start, end
                )));
            }
        }
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            columns: ColumnNames {
                device: self.device_column.clone(),
                start: self.start_column.clone(),
                end: self.end_column.clone(),
                stage: self.stage_column.clone(),
            },
            device_prefix: self.device_prefix.clone(),
            range: DateRange::from_dates(self.start, self.end),
        }
    }

    pub fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            scale: self.scale,
            markers: if self.lines {
                MarkerStyle::Lines
            } else {
                MarkerStyle::Points
            },
            zero_floor: self.zero_floor,
        }
    }
}
