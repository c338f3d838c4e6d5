//! Scoring fitted models on held-out data

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{FittedForecastModel, ForecastModel};
use crate::split::temporal_split;
use chrono::NaiveDate;
use demand_math::metrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

/// Error metric reported for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMetric {
    /// Root mean squared error
    Rmse,
    /// Mean absolute error
    Mae,
}

impl ErrorMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorMetric::Rmse => "RMSE",
            ErrorMetric::Mae => "MAE",
        }
    }

    /// Score predictions against actual values
    pub fn score(&self, actual: &[f64], predicted: &[f64]) -> Result<f64> {
        let value = match self {
            ErrorMetric::Rmse => metrics::root_mean_squared_error(actual, predicted),
            ErrorMetric::Mae => metrics::mean_absolute_error(actual, predicted),
        };
        value.map_err(ForecastError::from_metric)
    }
}

impl fmt::Display for ErrorMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score and aligned series for one evaluated model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub metric: ErrorMetric,
    pub value: f64,
    pub timestamps: Vec<NaiveDate>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

impl EvaluationResult {
    /// Score `predicted` against `actual`, keeping both series
    pub fn new(
        metric: ErrorMetric,
        timestamps: Vec<NaiveDate>,
        actual: Vec<f64>,
        predicted: Vec<f64>,
    ) -> Result<Self> {
        let value = metric.score(&actual, &predicted)?;
        if timestamps.len() != actual.len() {
            return Err(ForecastError::Misaligned(format!(
                "{} timestamps for {} values",
                timestamps.len(),
                actual.len()
            )));
        }

        Ok(Self {
            metric,
            value,
            timestamps,
            actual,
            predicted,
        })
    }

    /// Actual minus predicted, per timestamp
    pub fn residuals(&self) -> Vec<f64> {
        self.actual
            .iter()
            .zip(&self.predicted)
            .map(|(a, p)| a - p)
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.4}", self.metric, self.value)?;
        if let (Some(first), Some(last)) = (self.timestamps.first(), self.timestamps.last()) {
            write!(f, " over {} days ({} to {})", self.timestamps.len(), first, last)?;
        }
        Ok(())
    }
}

/// A fitted model and its score on the test part
#[derive(Debug)]
pub struct Evaluation<F> {
    pub model: F,
    pub result: EvaluationResult,
}

/// Split `series`, fit `model` on the training part and score its
/// predictions for the last `test_days` days.
#[instrument(skip(model, series), fields(model = model.name()))]
pub fn evaluate<M: ForecastModel>(
    model: &M,
    series: &TimeSeries,
    test_days: u32,
) -> Result<Evaluation<M::Fitted>> {
    let split = temporal_split(series, test_days);
    if split.train.is_empty() {
        return Err(ForecastError::InsufficientData(format!(
            "No training rows remain after holding out {} days",
            test_days
        )));
    }
    if split.test.is_empty() {
        return Err(ForecastError::InsufficientData(format!(
            "No test rows in the last {} days",
            test_days
        )));
    }

    let fitted = model.fit(&split.train)?;

    let inputs = split.test.rows(model.input_columns())?;
    let predicted = fitted.predict(split.test.timestamps(), &inputs)?;
    let actual = split.test.column(model.target_column())?.to_vec();

    let result = EvaluationResult::new(
        model.error_metric(),
        split.test.timestamps().to_vec(),
        actual,
        predicted,
    )?;

    info!(
        model = fitted.name(),
        metric = %result.metric,
        value = result.value,
        train_rows = split.train.len(),
        test_rows = split.test.len(),
        "evaluated model"
    );

    Ok(Evaluation {
        model: fitted,
        result,
    })
}
