//! Error types for translation and startup configuration.

use thiserror::Error;

/// A source row could not be turned into a destination point.
///
/// Translation of a window stops at the first bad row; the caller skips the
/// whole window.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslationError {
    #[error("column '{column}' not present in row (columns: {available})")]
    MissingColumn { column: String, available: String },

    #[error("column '{column}' is null")]
    NullValue { column: String },

    #[error("column '{column}' value '{value}' is not an integer")]
    InvalidInteger { column: String, value: String },

    #[error("column '{column}' value '{value}' is not a valid millisecond timestamp")]
    InvalidTimestamp { column: String, value: String },

    #[error("series '{series}' does not belong to a configured sensor")]
    UnknownSensor { series: String },

    #[error("row has {values} values but {columns} columns")]
    RowShape { columns: usize, values: usize },
}

/// Invalid startup configuration. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("sensor '{serial}' has no numeric id mapping")]
    MissingSensorId { serial: String },

    #[error("sensor '{serial}' appears more than once in the roster")]
    DuplicateSensor { serial: String },

    #[error("sensor roster is empty")]
    EmptyRoster,

    #[error("unknown downsample interval '{0}' (expected one of 30s, 1m, 5m, 1h, 1d, 1w)")]
    UnknownInterval(String),

    #[error("interval '{0}' cannot be backfilled window by window; run it as the weekly backfill")]
    WeeklyInAutomaticSet(String),

    #[error("'{value}' is not a valid time (expected yyyy-MM-dd HH:mm:ss)")]
    InvalidTime { value: String },

    #[error("time window start {start} is not before end {end}")]
    EmptyWindow { start: String, end: String },
}
