//! Small linear algebra helpers shared by the estimators

use crate::{MathError, Result};
use nalgebra::{DMatrix, DVector};

/// Ordinary least squares: solves `beta = (X'X)^-1 X'y`.
///
/// `rows` is the row-major design matrix; every row must have the same width.
pub fn ordinary_least_squares(rows: &[Vec<f64>], target: &[f64]) -> Result<Vec<f64>> {
    if rows.len() != target.len() {
        return Err(MathError::LengthMismatch {
            actual: target.len(),
            predicted: rows.len(),
        });
    }

    let n = rows.len();
    let k = rows.first().map(|r| r.len()).unwrap_or(0);
    if k == 0 {
        return Ok(Vec::new());
    }
    if n < k {
        return Err(MathError::InsufficientData(format!(
            "Least squares needs at least {} observations, got {}",
            k, n
        )));
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != k) {
        return Err(MathError::InvalidInput(format!(
            "Design row {} has {} columns, expected {}",
            bad,
            rows[bad].len(),
            k
        )));
    }

    let x = DMatrix::from_fn(n, k, |i, j| rows[i][j]);
    let y = DVector::from_column_slice(target);

    let xtx = x.transpose() * &x;
    let xty = x.transpose() * &y;

    let xtx_inv = xtx.try_inverse().ok_or_else(|| {
        MathError::SingularMatrix(format!(
            "{}x{} normal equations cannot be inverted",
            k, k
        ))
    })?;
    let beta = xtx_inv * xty;

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(MathError::CalculationError(
            "Least squares produced non-finite coefficients".to_string(),
        ));
    }

    Ok(beta.iter().copied().collect())
}

/// Multiply two polynomials in the lag operator, lowest power first.
pub fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Largest root modulus of `z^n - c[0] z^(n-1) - ... - c[n-1]`.
///
/// A lag polynomial `1 - c1 L - ... - cn L^n` is stationary (or, for the MA
/// side with negated coefficients, invertible) when this is below one.
pub fn spectral_radius(coefficients: &[f64]) -> f64 {
    let n = coefficients.len();
    if n == 0 {
        return 0.0;
    }

    let companion = DMatrix::from_fn(n, n, |i, j| {
        if i == 0 {
            coefficients[j]
        } else if i == j + 1 {
            1.0
        } else {
            0.0
        }
    });

    companion
        .complex_eigenvalues()
        .iter()
        .map(|c| c.re.hypot(c.im))
        .fold(0.0, f64::max)
}
