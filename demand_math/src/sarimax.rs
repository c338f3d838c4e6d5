//! Seasonal ARIMA with exogenous regressors
//!
//! The model is a regression of the differenced target on the differenced
//! regressors, with multiplicative seasonal ARMA errors:
//!
//! ```text
//! φ(L) Φ(L^s) u_t = θ(L) Θ(L^s) e_t
//! u_t = Δ^d Δ_s^D y_t - β' Δ^d Δ_s^D x_t
//! ```
//!
//! Estimation uses the Hannan-Rissanen procedure: regression coefficients by
//! ordinary least squares, innovations from a long autoregression on the
//! regression errors, then the ARMA coefficients by least squares on lagged
//! errors and lagged innovations.

use crate::linalg::{ordinary_least_squares, poly_mul, spectral_radius};
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};
use tracing::debug;

/// Non-seasonal (p, d, q) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SarimaxOrder {
    /// Autoregressive order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// Moving average order
    pub q: usize,
}

impl SarimaxOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl From<(usize, usize, usize)> for SarimaxOrder {
    fn from((p, d, q): (usize, usize, usize)) -> Self {
        Self::new(p, d, q)
    }
}

/// Seasonal (P, D, Q, s) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeasonalOrder {
    /// Seasonal autoregressive order
    pub p: usize,
    /// Seasonal differencing order
    pub d: usize,
    /// Seasonal moving average order
    pub q: usize,
    /// Number of periods in one season
    pub period: usize,
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, period: usize) -> Self {
        Self { p, d, q, period }
    }

    /// No seasonal component
    pub fn none() -> Self {
        Self::default()
    }

    fn has_terms(&self) -> bool {
        self.p + self.d + self.q > 0
    }
}

impl From<(usize, usize, usize, usize)> for SeasonalOrder {
    fn from((p, d, q, period): (usize, usize, usize, usize)) -> Self {
        Self::new(p, d, q, period)
    }
}

/// Estimation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarimaxConfig {
    pub order: SarimaxOrder,
    pub seasonal_order: SeasonalOrder,
    /// Reject fits whose autoregressive polynomial has a root on or inside the unit circle
    pub enforce_stationarity: bool,
    /// Reject fits whose moving average polynomial has a root on or inside the unit circle
    pub enforce_invertibility: bool,
    /// Add a constant regressor (a drift term once the series is differenced)
    pub with_intercept: bool,
}

impl Default for SarimaxConfig {
    fn default() -> Self {
        Self {
            order: SarimaxOrder::new(1, 0, 0),
            seasonal_order: SeasonalOrder::none(),
            enforce_stationarity: true,
            enforce_invertibility: true,
            with_intercept: false,
        }
    }
}

/// Unfitted seasonal ARIMA model
#[derive(Debug, Clone)]
pub struct Sarimax {
    config: SarimaxConfig,
}

/// Seasonal ARIMA model fitted to a training sample
#[derive(Debug, Clone)]
pub struct FittedSarimax {
    config: SarimaxConfig,
    /// Differencing polynomial coefficients, lowest lag first (delta[0] == 1)
    delta: Vec<f64>,
    /// Regression coefficients (intercept last when enabled)
    beta: Vec<f64>,
    ar_nonseasonal: Vec<f64>,
    ar_seasonal: Vec<f64>,
    ma_nonseasonal: Vec<f64>,
    ma_seasonal: Vec<f64>,
    /// Expanded AR coefficients: u_t = sum(ar[i] * u_{t-1-i}) + ...
    ar: Vec<f64>,
    /// Expanded MA coefficients: ... + e_t + sum(ma[i] * e_{t-1-i})
    ma: Vec<f64>,
    y_history: Vec<f64>,
    exog_history: Vec<Vec<f64>>,
    errors: Vec<f64>,
    residuals: Vec<f64>,
    sigma2: f64,
    log_likelihood: f64,
    aic: f64,
    bic: f64,
}

impl Sarimax {
    pub fn new(config: SarimaxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SarimaxConfig {
        &self.config
    }

    /// Fit the model to `y` with one regressor row per observation.
    ///
    /// `exog` may be empty when the model has no regressors.
    pub fn fit(&self, y: &[f64], exog: &[Vec<f64>]) -> Result<FittedSarimax> {
        let order = self.config.order;
        let seasonal = self.config.seasonal_order;

        if seasonal.has_terms() && seasonal.period < 2 {
            return Err(MathError::InvalidInput(format!(
                "Seasonal period must be at least 2 when seasonal terms are used, got {}",
                seasonal.period
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Target series contains non-finite values".to_string(),
            ));
        }

        let n_exog = regressor_width(exog, y.len())?;
        let delta = differencing_polynomial(order.d, seasonal.d, seasonal.period);
        let lost = delta.len() - 1;
        if y.len() <= lost + 1 {
            return Err(MathError::InsufficientData(format!(
                "Differencing removes {} observations from a sample of {}",
                lost,
                y.len()
            )));
        }

        // Differenced target and regressors
        let y_diff = apply_difference(y, &delta);
        let mut design: Vec<Vec<f64>> = vec![Vec::new(); y_diff.len()];
        for j in 0..n_exog {
            let column: Vec<f64> = exog.iter().map(|row| row[j]).collect();
            for (row, value) in design.iter_mut().zip(apply_difference(&column, &delta)) {
                row.push(value);
            }
        }
        if self.config.with_intercept {
            design.iter_mut().for_each(|row| row.push(1.0));
        }

        let beta = if design.first().map_or(true, |r| r.is_empty()) {
            Vec::new()
        } else {
            ordinary_least_squares(&design, &y_diff)?
        };
        let errors: Vec<f64> = y_diff
            .iter()
            .zip(design.iter())
            .map(|(yd, row)| yd - dot(row, &beta))
            .collect();

        let ar_lags = lag_set(order.p, seasonal.p, seasonal.period);
        let ma_lags = lag_set(order.q, seasonal.q, seasonal.period);
        let coefficients = estimate_arma(&errors, &ar_lags, &ma_lags)?;

        let (ar_part, ma_part) = coefficients.split_at(ar_lags.len());
        let (ar_nonseasonal, ar_seasonal) = ar_part.split_at(order.p);
        let (ma_nonseasonal, ma_seasonal) = ma_part.split_at(order.q);

        let ar = expand_ar(ar_nonseasonal, ar_seasonal, seasonal.period);
        let ma = expand_ma(ma_nonseasonal, ma_seasonal, seasonal.period);

        if self.config.enforce_stationarity {
            let radius = spectral_radius(&ar);
            if radius >= 1.0 {
                return Err(MathError::NonStationary(radius));
            }
        }
        if self.config.enforce_invertibility {
            let negated: Vec<f64> = ma.iter().map(|m| -m).collect();
            let radius = spectral_radius(&negated);
            if radius >= 1.0 {
                return Err(MathError::NonInvertible(radius));
            }
        }

        let residuals = arma_residuals(&errors, &ar, &ma);
        let burn_in = ar.len().min(residuals.len().saturating_sub(1));
        let effective = &residuals[burn_in..];
        let nobs = effective.len() as f64;
        let sigma2 = effective.iter().map(|e| e * e).sum::<f64>() / nobs;

        let normal = Normal::new(0.0, sigma2.sqrt().max(1e-12))
            .map_err(|e| MathError::CalculationError(e.to_string()))?;
        let log_likelihood: f64 = effective.iter().map(|&e| normal.ln_pdf(e)).sum();
        let n_params = (beta.len() + coefficients.len() + 1) as f64;
        let aic = -2.0 * log_likelihood + 2.0 * n_params;
        let bic = -2.0 * log_likelihood + n_params * nobs.ln();

        debug!(
            observations = y.len(),
            regressors = beta.len(),
            sigma2,
            aic,
            "fitted seasonal ARIMA"
        );

        Ok(FittedSarimax {
            config: self.config.clone(),
            delta,
            beta,
            ar_nonseasonal: ar_nonseasonal.to_vec(),
            ar_seasonal: ar_seasonal.to_vec(),
            ma_nonseasonal: ma_nonseasonal.to_vec(),
            ma_seasonal: ma_seasonal.to_vec(),
            ar,
            ma,
            y_history: y.to_vec(),
            exog_history: exog.to_vec(),
            errors,
            residuals,
            sigma2,
            log_likelihood,
            aic,
            bic,
        })
    }
}

impl FittedSarimax {
    /// Forecast the next `steps` values following the training sample.
    ///
    /// `exog` must hold one regressor row per step when the model was fitted
    /// with regressors, and may be empty otherwise.
    pub fn forecast(&self, steps: usize, exog: &[Vec<f64>]) -> Result<Vec<f64>> {
        let n_exog = self.exog_width();
        if n_exog > 0 {
            if exog.len() != steps {
                return Err(MathError::InvalidInput(format!(
                    "Forecasting {} steps needs {} regressor rows, got {}",
                    steps,
                    steps,
                    exog.len()
                )));
            }
            if let Some(bad) = exog.iter().position(|row| row.len() != n_exog) {
                return Err(MathError::InvalidInput(format!(
                    "Regressor row {} has {} columns, expected {}",
                    bad,
                    exog[bad].len(),
                    n_exog
                )));
            }
        }

        let mut combined_exog = self.exog_history.clone();
        combined_exog.extend(exog.iter().cloned());

        let mut y = self.y_history.clone();
        let mut errors = self.errors.clone();
        let mut shocks = self.residuals.clone();
        let mut forecasts = Vec::with_capacity(steps);

        for _ in 0..steps {
            let t = y.len();

            let mut regressors: Vec<f64> = (0..n_exog)
                .map(|j| {
                    self.delta
                        .iter()
                        .enumerate()
                        .map(|(lag, c)| c * combined_exog[t - lag][j])
                        .sum()
                })
                .collect();
            if self.config.with_intercept {
                regressors.push(1.0);
            }

            let error = lagged_sum(&errors, &self.ar) + lagged_sum(&shocks, &self.ma);
            let y_diff = dot(&regressors, &self.beta) + error;

            // Undo the differencing: y_t = Δy_t - sum(delta[j] * y_{t-j})
            let level = y_diff
                - self
                    .delta
                    .iter()
                    .enumerate()
                    .skip(1)
                    .map(|(lag, c)| c * y[t - lag])
                    .sum::<f64>();

            errors.push(error);
            shocks.push(0.0);
            y.push(level);
            forecasts.push(level);
        }

        Ok(forecasts)
    }

    /// Number of regressors supplied at fit time (excluding the intercept)
    pub fn exog_width(&self) -> usize {
        self.exog_history.first().map_or(0, |row| row.len())
    }

    pub fn config(&self) -> &SarimaxConfig {
        &self.config
    }

    /// Regression coefficients, intercept last when enabled
    pub fn regression_coefficients(&self) -> &[f64] {
        &self.beta
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_nonseasonal
    }

    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        &self.ar_seasonal
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_nonseasonal
    }

    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        &self.ma_seasonal
    }

    /// One-step innovations over the differenced training sample
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn aic(&self) -> f64 {
        self.aic
    }

    pub fn bic(&self) -> f64 {
        self.bic
    }

    pub fn nobs(&self) -> usize {
        self.y_history.len()
    }

    /// Human readable model summary
    pub fn summary(&self) -> String {
        let order = self.config.order;
        let seasonal = self.config.seasonal_order;
        let mut s = format!(
            "SARIMAX({},{},{})x({},{},{},{}) Model Summary\n",
            order.p, order.d, order.q, seasonal.p, seasonal.d, seasonal.q, seasonal.period
        );
        s.push_str(&"=".repeat(40));
        s.push('\n');

        let sections = [
            ("Regression", &self.beta),
            ("AR", &self.ar_nonseasonal),
            ("Seasonal AR", &self.ar_seasonal),
            ("MA", &self.ma_nonseasonal),
            ("Seasonal MA", &self.ma_seasonal),
        ];
        for (label, values) in sections {
            if values.is_empty() {
                continue;
            }
            s.push_str(&format!("{} coefficients:\n", label));
            for (i, c) in values.iter().enumerate() {
                s.push_str(&format!("  [{}] = {:.6}\n", i + 1, c));
            }
        }

        s.push_str(&format!("Observations: {}\n", self.nobs()));
        s.push_str(&format!("Sigma²: {:.6}\n", self.sigma2));
        s.push_str(&format!("Log likelihood: {:.2}\n", self.log_likelihood));
        s.push_str(&format!("AIC: {:.2}\n", self.aic));
        s.push_str(&format!("BIC: {:.2}\n", self.bic));
        s
    }
}

/// Width of the regressor matrix, checking it lines up with the target
fn regressor_width(exog: &[Vec<f64>], n: usize) -> Result<usize> {
    if exog.is_empty() {
        return Ok(0);
    }
    if exog.len() != n {
        return Err(MathError::InvalidInput(format!(
            "Regressors have {} rows but the target has {} observations",
            exog.len(),
            n
        )));
    }

    let width = exog[0].len();
    for (i, row) in exog.iter().enumerate() {
        if row.len() != width {
            return Err(MathError::InvalidInput(format!(
                "Regressor row {} has {} columns, expected {}",
                i,
                row.len(),
                width
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(format!(
                "Regressor row {} contains non-finite values",
                i
            )));
        }
    }
    Ok(width)
}

/// Coefficients of (1 - L)^d (1 - L^s)^D, lowest lag first
fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }
    for _ in 0..seasonal_d {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        poly = poly_mul(&poly, &seasonal);
    }
    poly
}

fn apply_difference(series: &[f64], delta: &[f64]) -> Vec<f64> {
    let lost = delta.len() - 1;
    (lost..series.len())
        .map(|t| {
            delta
                .iter()
                .enumerate()
                .map(|(lag, c)| c * series[t - lag])
                .sum()
        })
        .collect()
}

/// Lags 1..=p followed by s, 2s, ..., P*s
fn lag_set(order: usize, seasonal_order: usize, period: usize) -> Vec<usize> {
    (1..=order)
        .chain((1..=seasonal_order).map(|k| k * period))
        .collect()
}

/// Hannan-Rissanen estimation of the ARMA coefficients for the given lags.
///
/// Returns AR coefficients followed by MA coefficients, in lag-set order.
fn estimate_arma(series: &[f64], ar_lags: &[usize], ma_lags: &[usize]) -> Result<Vec<f64>> {
    if ar_lags.is_empty() && ma_lags.is_empty() {
        return Ok(Vec::new());
    }

    let n = series.len();
    let max_ar = ar_lags.iter().copied().max().unwrap_or(0);
    let max_ma = ma_lags.iter().copied().max().unwrap_or(0);

    let innovations = if ma_lags.is_empty() {
        Vec::new()
    } else {
        let long_order = (2 * max_ar.max(max_ma)).max(10).min(n / 3);
        if long_order == 0 {
            return Err(MathError::InsufficientData(format!(
                "{} observations are too few to estimate moving average terms",
                n
            )));
        }
        long_autoregression_innovations(series, long_order)?
    };

    let burn_in = if ma_lags.is_empty() {
        max_ar
    } else {
        max_ar.max(n - innovations.len() + max_ma)
    };
    let offset = n - innovations.len();
    let n_coef = ar_lags.len() + ma_lags.len();
    if n <= burn_in + n_coef {
        return Err(MathError::InsufficientData(format!(
            "Estimating {} ARMA coefficients needs more than {} observations, got {}",
            n_coef,
            burn_in + n_coef,
            n
        )));
    }

    let mut rows = Vec::with_capacity(n - burn_in);
    let mut target = Vec::with_capacity(n - burn_in);
    for t in burn_in..n {
        let mut row: Vec<f64> = ar_lags.iter().map(|&lag| series[t - lag]).collect();
        row.extend(ma_lags.iter().map(|&lag| innovations[t - lag - offset]));
        rows.push(row);
        target.push(series[t]);
    }

    ordinary_least_squares(&rows, &target)
}

/// Innovations from an AR(`order`) fit, aligned to `series[order..]`
fn long_autoregression_innovations(series: &[f64], order: usize) -> Result<Vec<f64>> {
    let rows: Vec<Vec<f64>> = (order..series.len())
        .map(|t| (1..=order).map(|lag| series[t - lag]).collect())
        .collect();
    let target = &series[order..];
    let phi = ordinary_least_squares(&rows, target)?;

    Ok(rows
        .iter()
        .zip(target.iter())
        .map(|(row, y)| y - dot(row, &phi))
        .collect())
}

/// Expand φ(L)Φ(L^s) into u_t = sum(c_i u_{t-i}) form
fn expand_ar(nonseasonal: &[f64], seasonal: &[f64], period: usize) -> Vec<f64> {
    let mut a = vec![1.0];
    a.extend(nonseasonal.iter().map(|c| -c));
    let mut b = vec![0.0; seasonal.len() * period + 1];
    b[0] = 1.0;
    for (k, c) in seasonal.iter().enumerate() {
        b[(k + 1) * period] = -c;
    }
    trim_trailing_zeros(poly_mul(&a, &b)[1..].iter().map(|c| -c).collect())
}

/// Expand θ(L)Θ(L^s) into e_t + sum(c_i e_{t-i}) form
fn expand_ma(nonseasonal: &[f64], seasonal: &[f64], period: usize) -> Vec<f64> {
    let mut a = vec![1.0];
    a.extend_from_slice(nonseasonal);
    let mut b = vec![0.0; seasonal.len() * period + 1];
    b[0] = 1.0;
    for (k, c) in seasonal.iter().enumerate() {
        b[(k + 1) * period] = *c;
    }
    trim_trailing_zeros(poly_mul(&a, &b)[1..].to_vec())
}

fn trim_trailing_zeros(mut coefficients: Vec<f64>) -> Vec<f64> {
    while coefficients.last() == Some(&0.0) {
        coefficients.pop();
    }
    coefficients
}

/// Conditional innovations of an ARMA process, pre-sample values taken as zero
fn arma_residuals(series: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let mut residuals: Vec<f64> = Vec::with_capacity(series.len());
    for t in 0..series.len() {
        let fitted = lagged_sum(&series[..t], ar) + lagged_sum(&residuals, ma);
        residuals.push(series[t] - fitted);
    }
    residuals
}

/// sum(coefficients[i] * history[len - 1 - i]), skipping lags before the start
fn lagged_sum(history: &[f64], coefficients: &[f64]) -> f64 {
    coefficients
        .iter()
        .zip(history.iter().rev())
        .map(|(c, h)| c * h)
        .sum()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
