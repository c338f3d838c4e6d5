//! Generate orders, aggregate daily demand and compare both models.
//!
//! Usage: `cargo run --example evaluate_models [config.json]`
//! Set `RUST_LOG=debug` for stage-by-stage logs.

use demand_forecast::features::add_calendar_features;
use demand_forecast::preprocessing::{demand_for_sku, generate_daily_demand, resample_to_daily};
use demand_forecast::synthetic::{seasonal_series, SyntheticOrders};
use demand_forecast::{evaluate, DataLoader, ForecastConfig, ModelSpec, TimeSeries};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ForecastConfig::from_json_file(path)?,
        None => ForecastConfig {
            test_days: 30,
            ..ForecastConfig::default()
        },
    };
    config.validate()?;

    // Raw orders -> daily demand file
    let dir = std::env::temp_dir().join("demand_forecast_demo");
    std::fs::create_dir_all(&dir)?;
    let orders_path = dir.join("orders.csv");
    let demand_path = dir.join("daily_demand.csv");

    let orders = SyntheticOrders::default().generate()?;
    DataLoader::write_orders(&orders_path, &orders)?;

    let (rows, report) = generate_daily_demand(
        &orders_path,
        Some(demand_path.as_path()),
        &config.aggregation_settings(),
    )?;
    println!(
        "Aggregated {} daily rows from {} orders ({} incomplete, {} duplicates dropped)",
        rows.len(),
        report.input_rows,
        report.dropped_nulls,
        report.dropped_duplicates
    );
    println!("Daily demand written to {}", demand_path.display());

    // One SKU, plus a promo calendar borrowed from a synthetic series
    let daily = resample_to_daily(&demand_for_sku(&rows, "SKU1"), config.fill_method()?);
    let demand = TimeSeries::from_daily(&daily)?;
    let promo_calendar = seasonal_series(demand.first_timestamp().unwrap_or_default(), demand.len(), 1)?;
    let series = add_calendar_features(
        &demand.with_feature("promo", promo_calendar.column("promo")?.to_vec())?,
    )?;

    let models: Vec<ModelSpec> = vec![
        config.seasonal_model().into(),
        config.ensemble_model().into(),
    ];

    println!("\nHolding out the last {} days", config.test_days);
    for model in &models {
        let evaluation = evaluate(model, &series, config.test_days)?;
        println!("{:<28} {}", demand_forecast::ForecastModel::name(model), evaluation.result);

        for ((date, actual), predicted) in evaluation
            .result
            .timestamps
            .iter()
            .zip(&evaluation.result.actual)
            .zip(&evaluation.result.predicted)
            .take(5)
        {
            println!("    {}  actual {:>6.1}  predicted {:>6.1}", date, actual, predicted);
        }
    }

    Ok(())
}
