//! Error types for the demand_forecast crate

use demand_math::MathError;
use thiserror::Error;

/// Custom error types for the demand_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Unrecognized or inconsistent configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The estimation routine behind a model adapter failed
    #[error("Fitting failed: {0}")]
    FittingFailed(#[source] MathError),

    /// Actual and predicted sequences differ in length
    #[error("Length mismatch: {actual} actual values vs {predicted} predicted values")]
    LengthMismatch { actual: usize, predicted: usize },

    /// Not enough rows to perform an operation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Prediction inputs do not line up with the fitted model
    #[error("Misaligned prediction inputs: {0}")]
    Misaligned(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// A named column is missing from a table or series
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from reading or writing CSV records
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<polars::prelude::PolarsError> for ForecastError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl ForecastError {
    /// Wrap a metric failure, keeping length mismatches as their own kind
    pub(crate) fn from_metric(err: MathError) -> Self {
        match err {
            MathError::LengthMismatch { actual, predicted } => {
                ForecastError::LengthMismatch { actual, predicted }
            }
            MathError::InsufficientData(msg) => ForecastError::InsufficientData(msg),
            other => ForecastError::DataError(other.to_string()),
        }
    }
}
