//! Error types for the fill-rate analytics core.

use thiserror::Error;

/// Result type for fill-rate operations.
pub type Result<T> = std::result::Result<T, FillRateError>;

/// Errors that can occur while ingesting, deriving, or aggregating.
#[derive(Debug, Error)]
pub enum FillRateError {
    /// Input could not be parsed as tabular data at all
    #[error("Unreadable input: {0}")]
    Unreadable(String),

    /// Input parsed, but no shift slot contained a single booked timestamp
    #[error("No booked shifts found in input")]
    NoShiftData,

    /// A column required by an operation is missing from the input
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// I/O failure while reading an input file
    #[error("Failed to read {path}: {source}")]
    FileRead {
        /// Path that failed to read
        path: std::path::PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// View not found in registry
    #[error("View not found: {0}")]
    NotFound(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}
