//! Error types for the budget_forecast crate

use crate::identity::{RESERVED_PRIMARY, RESERVED_SECONDARY};
use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the budget_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Required fields are absent from the source
    #[error("Schema error: series source missing fields {missing:?}")]
    SchemaError { missing: Vec<String> },

    /// A row carried a field that could not be read
    #[error("Invalid record at row {row}, field '{field}': {reason}")]
    InvalidRecord {
        row: usize,
        field: String,
        reason: String,
    },

    /// A whole column has a type that cannot be normalized
    #[error("Invalid column '{field}': {reason}")]
    InvalidColumn { field: String, reason: String },

    /// The identifier is neither a string nor an integer
    #[error("Invalid identifier type: {0} (expected an account UUID string or an integer >= 3)")]
    InvalidType(String),

    /// Integer identifiers below 3 are reserved for the two string accounts
    #[error("Identifier out of range: {0} (numeric identifiers must be >= 3; 1 and 2 are reserved)")]
    OutOfRange(i64),

    /// A string identifier other than the two reserved accounts
    #[error("Unknown identifier {0:?}, expected {} or {}", RESERVED_PRIMARY, RESERVED_SECONDARY)]
    UnknownIdentifier(String),

    /// A well-formed identifier with no rows in the source
    #[error("Identifier {identifier} not present in series data (integer ids present: {sample:?})")]
    IdentifierNotFound {
        identifier: String,
        sample: Vec<u64>,
    },

    /// Filtering left nothing to forecast from
    #[error("Empty series: user_id {0} has no rows in the series dataset")]
    EmptySeriesError(String),

    /// Rejected configuration values
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failure reported by a remote table client
    #[error("Remote dataset error: {0}")]
    RemoteError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the delimited-file reader
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON decoding
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

impl ForecastError {
    /// Whether the error concerns the requested identifier
    pub fn is_identifier_error(&self) -> bool {
        matches!(
            self,
            ForecastError::InvalidType(_)
                | ForecastError::OutOfRange(_)
                | ForecastError::UnknownIdentifier(_)
                | ForecastError::IdentifierNotFound { .. }
        )
    }

    /// Whether the error was raised while reading the series source
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            ForecastError::SchemaError { .. }
                | ForecastError::InvalidRecord { .. }
                | ForecastError::InvalidColumn { .. }
                | ForecastError::RemoteError(_)
                | ForecastError::IoError(_)
                | ForecastError::CsvError(_)
                | ForecastError::JsonError(_)
                | ForecastError::PolarsError(_)
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<holt_math::MathError> for ForecastError {
    fn from(err: holt_math::MathError) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
