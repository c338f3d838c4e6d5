//! Random forest regression on tabular features

use crate::data::{TimeSeries, VALUE_COLUMN};
use crate::error::{ForecastError, Result};
use crate::evaluation::ErrorMetric;
use crate::models::{FittedForecastModel, ForecastModel};
use chrono::NaiveDate;
use demand_math::{ForestConfig, MathError, RandomForest};
use tracing::debug;

/// Trees grown by the ensemble adapter
pub const ENSEMBLE_TREES: usize = 100;

/// Seed shared by every ensemble fit
pub const ENSEMBLE_SEED: u64 = 42;

/// Random forest adapter: 100 trees and a fixed seed, so two fits on the
/// same data predict the same values.
#[derive(Debug, Clone)]
pub struct EnsembleModel {
    name: String,
    feature_columns: Vec<String>,
    target_column: String,
    forest_config: ForestConfig,
}

/// Fitted random forest adapter
#[derive(Debug, Clone)]
pub struct FittedEnsembleModel {
    name: String,
    forest: RandomForest,
    feature_columns: Vec<String>,
}

impl EnsembleModel {
    pub fn new(feature_columns: Vec<String>, target_column: &str) -> Self {
        Self {
            name: "RandomForest".to_string(),
            feature_columns,
            target_column: target_column.to_string(),
            forest_config: ForestConfig {
                n_trees: ENSEMBLE_TREES,
                seed: ENSEMBLE_SEED,
                ..ForestConfig::default()
            },
        }
    }

    /// Adapter predicting `y` from the given columns
    pub fn with_features(feature_columns: &[&str]) -> Self {
        Self::new(
            feature_columns.iter().map(|c| c.to_string()).collect(),
            VALUE_COLUMN,
        )
    }

    pub fn forest_config(&self) -> &ForestConfig {
        &self.forest_config
    }
}

impl ForecastModel for EnsembleModel {
    type Fitted = FittedEnsembleModel;

    fn fit(&self, train: &TimeSeries) -> Result<FittedEnsembleModel> {
        if self.feature_columns.is_empty() {
            return Err(ForecastError::InvalidConfiguration(
                "The ensemble model needs at least one feature column".to_string(),
            ));
        }

        let features = train.rows(&self.feature_columns)?;
        let target = train.column(&self.target_column)?;

        let mut forest = RandomForest::new(self.forest_config.clone());
        forest
            .fit(&features, target)
            .map_err(ForecastError::FittingFailed)?;

        debug!(
            model = %self.name,
            rows = features.len(),
            features = self.feature_columns.len(),
            "fitted ensemble model"
        );

        Ok(FittedEnsembleModel {
            name: self.name.clone(),
            forest,
            feature_columns: self.feature_columns.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn error_metric(&self) -> ErrorMetric {
        ErrorMetric::Mae
    }

    fn input_columns(&self) -> &[String] {
        &self.feature_columns
    }

    fn target_column(&self) -> &str {
        &self.target_column
    }
}

impl FittedEnsembleModel {
    /// Relative importance of each feature column, in column order
    pub fn feature_importances(&self) -> Vec<(&str, f64)> {
        self.feature_columns
            .iter()
            .map(String::as_str)
            .zip(self.forest.feature_importances().iter().copied())
            .collect()
    }
}

impl FittedForecastModel for FittedEnsembleModel {
    /// Predict from one feature row per timestamp; the dates themselves are
    /// not used.
    fn predict(&self, timestamps: &[NaiveDate], inputs: &[Vec<f64>]) -> Result<Vec<f64>> {
        if inputs.len() != timestamps.len() {
            return Err(ForecastError::Misaligned(format!(
                "{} feature rows for {} timestamps",
                inputs.len(),
                timestamps.len()
            )));
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        self.forest.predict(inputs).map_err(|err| match err {
            MathError::InvalidInput(msg) => ForecastError::Misaligned(msg),
            other => ForecastError::DataError(other.to_string()),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
