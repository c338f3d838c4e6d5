//! # Demand Forecast Workspace
//!
//! Umbrella crate re-exporting the workspace libraries:
//!
//! - [`demand_forecast`]: order aggregation, daily series, model adapters and evaluation
//! - [`demand_math`]: seasonal ARIMA, random forest and error metrics
//!
//! ## Example
//!
//! ```
//! use demand_forecast_workspace::demand_math::metrics::mean_absolute_error;
//!
//! let mae = mean_absolute_error(&[10.0, 12.0, 8.0], &[9.0, 13.0, 8.0]).unwrap();
//! assert!((mae - 2.0 / 3.0).abs() < 1e-12);
//! ```

pub use demand_forecast;
pub use demand_math;

#[cfg(test)]
mod tests {
    use super::demand_forecast::preprocessing::FillMethod;
    use super::demand_forecast::ForecastConfig;

    #[test]
    fn test_default_config_is_valid() {
        let config = ForecastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fill_method().unwrap(), FillMethod::ForwardFill);
    }
}
