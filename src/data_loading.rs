use crate::error::{Result, SleepStatsError};
use crate::SleepInterval;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use csv::StringRecord;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Timestamp layout used by the export, e.g. `2024-01-01 23:00:00 +0000`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

const SEPARATOR_PREFIX: &[u8] = b"sep=";

/// Header names of the columns the parser needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub device: String,
    pub start: String,
    pub end: String,
    pub stage: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            device: "productType".to_string(),
            start: "startDate".to_string(),
            end: "endDate".to_string(),
            stage: "value".to_string(),
        }
    }
}

/// Positions of the required columns, resolved once from the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub device: usize,
    pub start: usize,
    pub end: usize,
    pub stage: usize,
}

impl ColumnIndex {
    pub fn resolve(header: &StringRecord, names: &ColumnNames) -> Result<Self> {
        let mapping: BTreeMap<&str, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name, i))
            .collect();
        debug!("Header mapping: {:?}", mapping);

        let lookup = |name: &str| {
            mapping
                .get(name)
                .copied()
                .ok_or_else(|| SleepStatsError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            device: lookup(&names.device)?,
            start: lookup(&names.start)?,
            end: lookup(&names.end)?,
            stage: lookup(&names.stage)?,
        })
    }
}

/// Inclusive bounds on interval start and end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Bounds at midnight UTC of the given days.
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN).and_utc();
        Self {
            start: start.map(midnight),
            end: end.map(midnight),
        }
    }

    pub fn contains(&self, interval: &SleepInterval) -> bool {
        self.start.is_none_or(|s| interval.start >= s) && self.end.is_none_or(|e| interval.end <= e)
    }
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub columns: ColumnNames,
    /// Rows whose device field lacks this prefix are skipped.
    pub device_prefix: String,
    pub range: DateRange,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            device_prefix: "Watch".to_string(),
            range: DateRange::default(),
        }
    }
}

pub fn matches_device_class(device: &str, prefix: &str) -> bool {
    device.starts_with(prefix)
}

/// Parses an export timestamp and normalizes it to UTC.
pub fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(value, TIMESTAMP_FORMAT).map(|dt| dt.with_timezone(&Utc))
}

/// Consumes a leading `sep=` line if present and returns the delimiter it declares.
///
/// The outer `Option` reports whether a line was consumed; the inner one holds
/// the delimiter when it is a single ASCII byte.
pub fn skip_separator_line<R: BufRead>(reader: &mut R) -> Result<Option<Option<u8>>> {
    if !reader.fill_buf()?.starts_with(SEPARATOR_PREFIX) {
        return Ok(None);
    }

    let mut line = String::new();
    reader.read_line(&mut line)?;
    let declared = line[SEPARATOR_PREFIX.len()..].trim_end_matches(['\r', '\n']);

    match declared.as_bytes() {
        [byte] if byte.is_ascii() => Ok(Some(Some(*byte))),
        _ => {
            warn!(
                "Ignoring unsupported separator declaration '{}', using ','",
                declared
            );
            Ok(Some(None))
        }
    }
}

/// Builds a CSV reader positioned at the header row.
///
/// Returns the reader and the number of lines consumed before it.
pub fn export_reader<R: BufRead>(mut reader: R) -> Result<(csv::Reader<R>, u64)> {
    let mut builder = csv::ReaderBuilder::new();
    let skipped = match skip_separator_line(&mut reader)? {
        Some(Some(delimiter)) => {
            builder.delimiter(delimiter);
            1
        }
        Some(None) => 1,
        None => 0,
    };
    Ok((builder.from_reader(reader), skipped))
}

pub fn parse_records<R: BufRead>(reader: R, options: &ParseOptions) -> Result<Vec<SleepInterval>> {
    let (mut rdr, line_offset) = export_reader(reader)?;
    let columns = ColumnIndex::resolve(rdr.headers()?, &options.columns)?;

    let mut intervals = Vec::new();
    let mut skipped_device = 0usize;
    let mut skipped_range = 0usize;

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line()) + line_offset;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        if !matches_device_class(field(columns.device), &options.device_prefix) {
            skipped_device += 1;
            continue;
        }

        let timestamp = |idx: usize, column: &str| {
            parse_timestamp(field(idx)).map_err(|e| SleepStatsError::MalformedRecord {
                line,
                column: column.to_string(),
                value: field(idx).to_string(),
                reason: e.to_string(),
            })
        };
        let start = timestamp(columns.start, &options.columns.start)?;
        let end = timestamp(columns.end, &options.columns.end)?;

        let interval = SleepInterval::new(start, end, field(columns.stage)).ok_or_else(|| {
            SleepStatsError::MalformedRecord {
                line,
                column: options.columns.end.clone(),
                value: field(columns.end).to_string(),
                reason: format!("end precedes start {}", field(columns.start)),
            }
        })?;

        if options.range.contains(&interval) {
            intervals.push(interval);
        } else {
            skipped_range += 1;
        }
    }

    debug!(
        "Skipped {} rows from other devices, {} rows outside the date range",
        skipped_device, skipped_range
    );
    info!("Parsed {} sleep intervals", intervals.len());

    Ok(intervals)
}

/// Reads an export file. The handle is dropped before returning on every path.
pub fn read_export_file(path: &Path, options: &ParseOptions) -> Result<Vec<SleepInterval>> {
    let file = File::open(path).map_err(|source| SleepStatsError::SourceRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(BufReader::new(file), options).map_err(|e| match e {
        SleepStatsError::Io(source) => SleepStatsError::SourceRead {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}
