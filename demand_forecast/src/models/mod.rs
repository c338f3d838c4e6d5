//! Forecasting model adapters
//!
//! Every adapter exposes the same two-step contract: [`ForecastModel::fit`]
//! on a training series, then [`FittedForecastModel::predict`] for a set of
//! test timestamps and their input rows.

use crate::data::{TimeSeries, VALUE_COLUMN};
use crate::error::Result;
use crate::evaluation::ErrorMetric;
use chrono::NaiveDate;
use std::fmt::Debug;

pub mod ensemble;
pub mod seasonal;

pub use ensemble::{EnsembleModel, FittedEnsembleModel};
pub use seasonal::{FittedSeasonalModel, SeasonalModel};

/// Fitted forecast model
pub trait FittedForecastModel: Debug {
    /// Predict one value per timestamp. `inputs` holds one row per
    /// timestamp with the values of the model's input columns.
    fn predict(&self, timestamps: &[NaiveDate], inputs: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be fitted on a daily series
pub trait ForecastModel: Debug + Clone {
    /// The type of fitted model produced
    type Fitted: FittedForecastModel;

    /// Fit the model on a training series
    fn fit(&self, train: &TimeSeries) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> &str;

    /// Metric used to score this model's predictions
    fn error_metric(&self) -> ErrorMetric;

    /// Columns whose test values are passed to `predict`
    fn input_columns(&self) -> &[String];

    /// Column holding the values being forecast
    fn target_column(&self) -> &str {
        VALUE_COLUMN
    }
}

/// Either adapter, for callers that pick the model at runtime
#[derive(Debug, Clone)]
pub enum ModelSpec {
    Seasonal(SeasonalModel),
    Ensemble(EnsembleModel),
}

/// A fitted [`ModelSpec`]
#[derive(Debug)]
pub enum FittedModel {
    Seasonal(FittedSeasonalModel),
    Ensemble(FittedEnsembleModel),
}

impl From<SeasonalModel> for ModelSpec {
    fn from(model: SeasonalModel) -> Self {
        ModelSpec::Seasonal(model)
    }
}

impl From<EnsembleModel> for ModelSpec {
    fn from(model: EnsembleModel) -> Self {
        ModelSpec::Ensemble(model)
    }
}

impl ForecastModel for ModelSpec {
    type Fitted = FittedModel;

    fn fit(&self, train: &TimeSeries) -> Result<FittedModel> {
        match self {
            ModelSpec::Seasonal(m) => m.fit(train).map(FittedModel::Seasonal),
            ModelSpec::Ensemble(m) => m.fit(train).map(FittedModel::Ensemble),
        }
    }

    fn name(&self) -> &str {
        match self {
            ModelSpec::Seasonal(m) => m.name(),
            ModelSpec::Ensemble(m) => m.name(),
        }
    }

    fn error_metric(&self) -> ErrorMetric {
        match self {
            ModelSpec::Seasonal(m) => m.error_metric(),
            ModelSpec::Ensemble(m) => m.error_metric(),
        }
    }

    fn input_columns(&self) -> &[String] {
        match self {
            ModelSpec::Seasonal(m) => m.input_columns(),
            ModelSpec::Ensemble(m) => m.input_columns(),
        }
    }

    fn target_column(&self) -> &str {
        match self {
            ModelSpec::Seasonal(m) => m.target_column(),
            ModelSpec::Ensemble(m) => m.target_column(),
        }
    }
}

impl FittedForecastModel for FittedModel {
    fn predict(&self, timestamps: &[NaiveDate], inputs: &[Vec<f64>]) -> Result<Vec<f64>> {
        match self {
            FittedModel::Seasonal(m) => m.predict(timestamps, inputs),
            FittedModel::Ensemble(m) => m.predict(timestamps, inputs),
        }
    }

    fn name(&self) -> &str {
        match self {
            FittedModel::Seasonal(m) => m.name(),
            FittedModel::Ensemble(m) => m.name(),
        }
    }
}
