use demand_forecast::models::ForecastModel;
use demand_forecast::preprocessing::{CleaningPolicy, FillMethod};
use demand_forecast::{ForecastConfig, ForecastError};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let config = ForecastConfig::default();

    assert_eq!(config.fulfilled_status, "Delivered");
    assert_eq!(config.test_days, 90);
    assert_eq!(config.fill_method().unwrap(), FillMethod::ForwardFill);
    assert_eq!(config.cleaning, CleaningPolicy::default());
    assert_eq!(config.ensemble.target_column, "y");
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_from_json_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "fulfilled_status": "Shipped",
            "test_days": 28,
            "fill_method": "zero",
            "cleaning": {{ "drop_duplicates": false }},
            "seasonal": {{
                "order": [1, 0, 0],
                "seasonal_order": [0, 1, 1, 7],
                "exog_columns": ["promo"]
            }},
            "ensemble": {{ "feature_columns": ["day_of_week", "promo"] }}
        }}"#
    )
    .unwrap();

    let config = ForecastConfig::from_json_file(file.path()).unwrap();

    assert_eq!(config.test_days, 28);
    assert_eq!(config.fill_method().unwrap(), FillMethod::ZeroFill);
    assert_eq!(
        config.cleaning,
        CleaningPolicy {
            drop_nulls: true,
            drop_duplicates: false,
        }
    );

    let settings = config.aggregation_settings();
    assert_eq!(settings.fulfilled_status, "Shipped");

    let seasonal = config.seasonal_model();
    assert_eq!(seasonal.name(), "SARIMAX(1,0,0)(0,1,1,7)");
    assert_eq!(seasonal.input_columns(), &["promo".to_string()]);
    assert!(!seasonal.config().enforce_stationarity);
    assert!(!seasonal.config().enforce_invertibility);

    let ensemble = config.ensemble_model();
    assert_eq!(ensemble.input_columns().len(), 2);
    assert_eq!(ensemble.target_column(), "y");
    assert_eq!(ensemble.forest_config().n_trees, 100);
    assert_eq!(ensemble.forest_config().seed, 42);
}

#[test]
fn test_config_round_trips_through_json() {
    let config = ForecastConfig {
        test_days: 14,
        ..ForecastConfig::default()
    };

    let json = config.to_json().unwrap();
    assert_eq!(ForecastConfig::from_json_str(&json).unwrap(), config);
}

#[test]
fn test_invalid_values() {
    assert!(matches!(
        ForecastConfig::from_json_str("{ \"test_days\": \"ninety\" }"),
        Err(ForecastError::SerdeError(_))
    ));

    let config = ForecastConfig {
        test_days: 0,
        ..ForecastConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ForecastError::InvalidConfiguration(_))
    ));
}
