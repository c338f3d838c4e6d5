//! Error metrics for comparing predicted values against observations

use crate::{MathError, Result};

/// Check that both sequences have the same non-zero length
fn check_aligned(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() {
        return Err(MathError::LengthMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }

    if actual.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute an error metric over zero observations".to_string(),
        ));
    }

    Ok(())
}

/// Mean Absolute Error
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_aligned(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();

    Ok(sum / actual.len() as f64)
}

/// Mean Squared Error
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_aligned(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    Ok(sum / actual.len() as f64)
}

/// Root Mean Squared Error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(actual, predicted)?.sqrt())
}

/// Mean Absolute Percentage Error, in percent.
///
/// Observations equal to zero are skipped, which is common for intermittent
/// demand. Returns an error when every observation is zero.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_aligned(actual, predicted)?;

    let (sum, count) = actual
        .iter()
        .zip(predicted.iter())
        .filter(|(&a, _)| a != 0.0)
        .fold((0.0, 0usize), |(sum, count), (a, p)| {
            (sum + ((a - p) / a).abs(), count + 1)
        });

    if count == 0 {
        return Err(MathError::CalculationError(
            "MAPE is undefined when every observation is zero".to_string(),
        ));
    }

    Ok(sum / count as f64 * 100.0)
}
