//! Seasonal ARIMA with exogenous regressors

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::evaluation::ErrorMetric;
use crate::models::{FittedForecastModel, ForecastModel};
use chrono::{Duration, NaiveDate};
use demand_math::{FittedSarimax, MathError, Sarimax, SarimaxConfig, SarimaxOrder, SeasonalOrder};
use tracing::debug;

/// Seasonal ARIMA adapter.
///
/// Stationarity and invertibility are not enforced, so any order that the
/// estimator can solve produces a fit.
#[derive(Debug, Clone)]
pub struct SeasonalModel {
    name: String,
    config: SarimaxConfig,
    exog_columns: Vec<String>,
}

/// Fitted seasonal ARIMA adapter
#[derive(Debug, Clone)]
pub struct FittedSeasonalModel {
    name: String,
    inner: FittedSarimax,
    train_end: NaiveDate,
    exog_columns: Vec<String>,
}

impl SeasonalModel {
    /// Create a new adapter. `exog_columns` name the regressors read from
    /// the series at fit and predict time.
    pub fn new(
        order: impl Into<SarimaxOrder>,
        seasonal_order: impl Into<SeasonalOrder>,
        exog_columns: Vec<String>,
    ) -> Self {
        let order = order.into();
        let seasonal_order = seasonal_order.into();

        Self {
            name: format!(
                "SARIMAX({},{},{})({},{},{},{})",
                order.p,
                order.d,
                order.q,
                seasonal_order.p,
                seasonal_order.d,
                seasonal_order.q,
                seasonal_order.period
            ),
            config: SarimaxConfig {
                order,
                seasonal_order,
                enforce_stationarity: false,
                enforce_invertibility: false,
                with_intercept: false,
            },
            exog_columns,
        }
    }

    /// Add a constant regressor
    pub fn with_intercept(mut self, enabled: bool) -> Self {
        self.config.with_intercept = enabled;
        self
    }

    pub fn config(&self) -> &SarimaxConfig {
        &self.config
    }
}

impl ForecastModel for SeasonalModel {
    type Fitted = FittedSeasonalModel;

    fn fit(&self, train: &TimeSeries) -> Result<FittedSeasonalModel> {
        let train_end = train.last_timestamp().ok_or_else(|| {
            ForecastError::InsufficientData("Cannot fit on an empty series".to_string())
        })?;
        let exog = train.rows(&self.exog_columns)?;

        let inner = Sarimax::new(self.config.clone())
            .fit(train.values(), &exog)
            .map_err(ForecastError::FittingFailed)?;

        debug!(model = %self.name, nobs = inner.nobs(), aic = inner.aic(), "fitted seasonal model");

        Ok(FittedSeasonalModel {
            name: self.name.clone(),
            inner,
            train_end,
            exog_columns: self.exog_columns.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn error_metric(&self) -> ErrorMetric {
        ErrorMetric::Rmse
    }

    fn input_columns(&self) -> &[String] {
        &self.exog_columns
    }
}

impl FittedSeasonalModel {
    /// Underlying estimation result
    pub fn inner(&self) -> &FittedSarimax {
        &self.inner
    }

    /// Last training date
    pub fn train_end(&self) -> NaiveDate {
        self.train_end
    }
}

impl FittedForecastModel for FittedSeasonalModel {
    /// Forecast the days following the training sample. `timestamps` must
    /// start the day after the last training date and run without gaps.
    fn predict(&self, timestamps: &[NaiveDate], inputs: &[Vec<f64>]) -> Result<Vec<f64>> {
        if timestamps.is_empty() {
            return Ok(Vec::new());
        }

        for (step, date) in timestamps.iter().enumerate() {
            let expected = self.train_end + Duration::days(step as i64 + 1);
            if *date != expected {
                return Err(ForecastError::Misaligned(format!(
                    "Forecast step {} is dated {} but the training sample ends {}, expected {}",
                    step + 1,
                    date,
                    self.train_end,
                    expected
                )));
            }
        }

        if !self.exog_columns.is_empty() && inputs.len() != timestamps.len() {
            return Err(ForecastError::Misaligned(format!(
                "{} regressor rows for {} timestamps",
                inputs.len(),
                timestamps.len()
            )));
        }

        self.inner
            .forecast(timestamps.len(), inputs)
            .map_err(|err| match err {
                MathError::InvalidInput(msg) => ForecastError::Misaligned(msg),
                other => ForecastError::DataError(other.to_string()),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
