//! JSON configuration for a forecasting run

use crate::data::VALUE_COLUMN;
use crate::error::{ForecastError, Result};
use crate::models::{EnsembleModel, SeasonalModel};
use crate::preprocessing::{AggregationSettings, CleaningPolicy, FillMethod, DEFAULT_FULFILLED_STATUS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for the seasonal ARIMA adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalSettings {
    /// (p, d, q)
    pub order: (usize, usize, usize),
    /// (P, D, Q, s)
    pub seasonal_order: (usize, usize, usize, usize),
    pub exog_columns: Vec<String>,
}

impl Default for SeasonalSettings {
    fn default() -> Self {
        Self {
            order: (1, 0, 0),
            seasonal_order: (1, 1, 0, 7),
            exog_columns: Vec::new(),
        }
    }
}

/// Settings for the random forest adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleSettings {
    pub feature_columns: Vec<String>,
    pub target_column: String,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        Self {
            feature_columns: vec![
                "day_of_week".to_string(),
                "month".to_string(),
                "is_weekend".to_string(),
            ],
            target_column: VALUE_COLUMN.to_string(),
        }
    }
}

/// Configuration of a forecasting run. Every field has a default, so a
/// partial JSON document is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Status whose orders count as demand
    pub fulfilled_status: String,
    /// Days held out for testing
    pub test_days: u32,
    /// Gap fill method name: ffill, bfill or zero
    pub fill_method: String,
    pub cleaning: CleaningPolicy,
    pub seasonal: SeasonalSettings,
    pub ensemble: EnsembleSettings,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            fulfilled_status: DEFAULT_FULFILLED_STATUS.to_string(),
            test_days: 90,
            fill_method: FillMethod::ForwardFill.as_str().to_string(),
            cleaning: CleaningPolicy::default(),
            seasonal: SeasonalSettings::default(),
            ensemble: EnsembleSettings::default(),
        }
    }
}

impl ForecastConfig {
    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.fill_method()?;
        if self.test_days == 0 {
            return Err(ForecastError::InvalidConfiguration(
                "test_days must be positive".to_string(),
            ));
        }
        if self.fulfilled_status.trim().is_empty() {
            return Err(ForecastError::InvalidConfiguration(
                "fulfilled_status must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn fill_method(&self) -> Result<FillMethod> {
        self.fill_method.parse()
    }

    pub fn aggregation_settings(&self) -> AggregationSettings {
        AggregationSettings {
            fulfilled_status: self.fulfilled_status.clone(),
            cleaning: self.cleaning,
        }
    }

    pub fn seasonal_model(&self) -> SeasonalModel {
        SeasonalModel::new(
            self.seasonal.order,
            self.seasonal.seasonal_order,
            self.seasonal.exog_columns.clone(),
        )
    }

    pub fn ensemble_model(&self) -> EnsembleModel {
        EnsembleModel::new(
            self.ensemble.feature_columns.clone(),
            &self.ensemble.target_column,
        )
    }
}
