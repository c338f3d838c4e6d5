//! # Demand Math
//!
//! Numerical estimation routines used by the demand forecasting toolkit.
//! This crate provides the model fitting and scoring primitives; it knows
//! nothing about orders, dates or files.
//!
//! - [`metrics`]: scalar error measures between actual and predicted values
//! - [`sarimax`]: seasonal ARIMA with exogenous regressors
//! - [`forest`]: regression trees and random forests

use thiserror::Error;

pub mod forest;
pub mod linalg;
pub mod metrics;
pub mod sarimax;

pub use forest::{ForestConfig, RandomForest, RegressionTree, TreeConfig};
pub use sarimax::{FittedSarimax, Sarimax, SarimaxConfig, SarimaxOrder, SeasonalOrder};

/// Errors that can occur in numerical estimation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Length mismatch: {actual} actual values vs {predicted} predicted values")]
    LengthMismatch { actual: usize, predicted: usize },

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),

    #[error("Autoregressive polynomial is not stationary (spectral radius {0:.4})")]
    NonStationary(f64),

    #[error("Moving average polynomial is not invertible (spectral radius {0:.4})")]
    NonInvertible(f64),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;
