use demand_forecast::data::{DataLoader, TimeSeries};
use demand_forecast::features::{add_calendar_features, add_lag_feature, add_rolling_mean};
use demand_forecast::preprocessing::{demand_for_sku, generate_daily_demand, resample_to_daily};
use demand_forecast::synthetic::SyntheticOrders;
use demand_forecast::{evaluate, ForecastConfig};
use tempfile::TempDir;

#[test]
fn test_full_forecast_workflow() {
    let dir = TempDir::new().unwrap();
    let orders_path = dir.path().join("orders.csv");
    let demand_path = dir.path().join("daily_demand.csv");

    // 1. Raw orders with cancellations, duplicates and blanks
    let orders = SyntheticOrders {
        days: 150,
        ..SyntheticOrders::default()
    }
    .generate()
    .unwrap();
    DataLoader::write_orders(&orders_path, &orders).unwrap();

    // 2. Aggregate delivered demand per SKU and day
    let config = ForecastConfig {
        test_days: 30,
        fill_method: "zero".to_string(),
        ..ForecastConfig::default()
    };
    config.validate().unwrap();

    let (rows, report) = generate_daily_demand(
        &orders_path,
        Some(demand_path.as_path()),
        &config.aggregation_settings(),
    )
    .unwrap();
    assert_eq!(report.input_rows, orders.len());
    assert!(report.output_rows <= report.input_rows);
    assert!(demand_path.exists());

    // 3. One SKU as a gap-free daily series
    let daily = resample_to_daily(&demand_for_sku(&rows, "SKU1"), config.fill_method().unwrap());
    let series = TimeSeries::from_daily(&daily).unwrap();
    assert!(series.is_contiguous());
    assert!(series.len() >= 140);

    // 4. Features for the ensemble model
    let featured = add_rolling_mean(
        &add_lag_feature(&add_calendar_features(&series).unwrap(), 7).unwrap(),
        7,
    )
    .unwrap();

    let ensemble = ForecastConfig {
        ensemble: demand_forecast::config::EnsembleSettings {
            feature_columns: vec![
                "day_of_week".to_string(),
                "is_weekend".to_string(),
                "lag_7".to_string(),
                "rolling_mean_7".to_string(),
            ],
            target_column: "y".to_string(),
        },
        ..config.clone()
    }
    .ensemble_model();
    let forest = evaluate(&ensemble, &featured, config.test_days).unwrap();
    assert_eq!(forest.result.predicted.len(), 30);
    assert_eq!(forest.result.actual.len(), forest.result.predicted.len());

    // 5. Seasonal model on the plain series
    let seasonal = ForecastConfig {
        seasonal: demand_forecast::config::SeasonalSettings {
            order: (1, 0, 0),
            seasonal_order: (1, 1, 0, 7),
            exog_columns: Vec::new(),
        },
        ..config.clone()
    }
    .seasonal_model();
    let sarimax = evaluate(&seasonal, &series, config.test_days).unwrap();
    assert_eq!(sarimax.result.timestamps, forest.result.timestamps);
    assert!(sarimax.result.value.is_finite());

    let json = sarimax.result.to_json().unwrap();
    assert!(json.contains("\"metric\": \"rmse\""));
}
