use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run. There is no recoverable tier.
#[derive(Error, Debug)]
pub enum SleepStatsError {
    /// Invalid command-line input.
    #[error("{0}")]
    Usage(String),

    /// The export file could not be opened or read.
    #[error("Failed to read file {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV stream could not be tokenized.
    #[error("Failed to read CSV data: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header row.
    #[error("Missing required column '{0}' in header")]
    MissingColumn(String),

    /// A retained row could not be turned into a sleep interval.
    #[error("Malformed record on line {line}, column '{column}' ('{value}'): {reason}")]
    MalformedRecord {
        line: u64,
        column: String,
        value: String,
        reason: String,
    },

    /// The chart could not be drawn or saved.
    #[error("Failed to render chart: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SleepStatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_read_display() {
        let err = SleepStatsError::SourceRead {
            path: PathBuf::from("/exports/sleep.csv"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/exports/sleep.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_missing_column_display() {
        let err = SleepStatsError::MissingColumn("productType".to_string());
        assert_eq!(err.to_string(), "Missing required column 'productType' in header");
    }

    #[test]
    fn test_malformed_record_display() {
        let err = SleepStatsError::MalformedRecord {
            line: 3,
            column: "startDate".to_string(),
            value: "yesterday".to_string(),
            reason: "input contains invalid characters".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Malformed record on line 3"));
        assert!(msg.contains("'startDate'"));
        assert!(msg.contains("'yesterday'"));
    }

    #[test]
    fn test_usage_is_verbatim() {
        let err = SleepStatsError::Usage("start date is after end date".to_string());
        assert_eq!(err.to_string(), "start date is after end date");
    }
}
