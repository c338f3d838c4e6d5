//! # Demand Forecast
//!
//! A Rust library for turning raw order records into daily demand series and
//! scoring forecasting models on a held-out window.
//!
//! ## Features
//!
//! - Order cleaning and per-SKU daily demand aggregation (CSV in, CSV out)
//! - Daily resampling with forward, backward or zero gap filling
//! - Date-based train/test splitting
//! - Seasonal ARIMA with exogenous regressors and random forest adapters
//! - RMSE / MAE evaluation with the actual and predicted series kept aligned
//! - Calendar, lag and rolling mean features
//! - JSON configuration and seeded synthetic data
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use demand_forecast::evaluation::evaluate;
//! use demand_forecast::features::add_calendar_features;
//! use demand_forecast::models::EnsembleModel;
//! use demand_forecast::synthetic::seasonal_series;
//!
//! # fn main() -> demand_forecast::error::Result<()> {
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let series = add_calendar_features(&seasonal_series(start, 120, 7)?)?;
//!
//! let model = EnsembleModel::with_features(&["day_of_week", "promo"]);
//! let evaluation = evaluate(&model, &series, 30)?;
//!
//! assert_eq!(evaluation.result.predicted.len(), 30);
//! println!("{}", evaluation.result);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod models;
pub mod preprocessing;
pub mod split;
pub mod synthetic;

// Re-export commonly used types
pub use crate::config::ForecastConfig;
pub use crate::data::{DataLoader, TimeSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::evaluation::{evaluate, ErrorMetric, Evaluation, EvaluationResult};
pub use crate::models::{
    EnsembleModel, FittedForecastModel, FittedModel, ForecastModel, ModelSpec, SeasonalModel,
};
pub use crate::preprocessing::{
    aggregate_daily, aggregate_demand_by_sku, clean_orders, generate_daily_demand,
    resample_to_daily, AggregationSettings, CleaningPolicy, CleaningReport, DailyDemand,
    DailyValue, FillMethod, RawOrder,
};
pub use crate::split::{temporal_split, SplitResult};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
