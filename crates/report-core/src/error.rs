use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the shift report crates.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A wall-clock time string did not match any recognised format.
    #[error("Invalid time format: {0}")]
    TimeParse(String),

    /// A calendar date string did not match any recognised format.
    #[error("Invalid date format: {0}")]
    DateParse(String),

    /// A machine-state code outside the known 1–7 range.
    #[error("Unknown machine mode code: {0}")]
    UnknownMode(u8),

    /// The expected event data directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No JSONL event files were found under the given directory.
    #[error("No JSONL files found in {0}")]
    NoDataFiles(PathBuf),

    /// The shift calendar failed validation (breaks outside the window,
    /// overlapping breaks, inverted window).
    #[error("Invalid shift calendar: {0}")]
    InvalidCalendar(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the report crates.
pub type Result<T> = std::result::Result<T, ReportError>;
