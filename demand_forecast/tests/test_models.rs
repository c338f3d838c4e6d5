use approx::assert_abs_diff_eq;
use chrono::{Duration, NaiveDate};
use demand_forecast::evaluation::{evaluate, ErrorMetric};
use demand_forecast::features::add_calendar_features;
use demand_forecast::models::{
    EnsembleModel, FittedForecastModel, FittedModel, ForecastModel, ModelSpec, SeasonalModel,
};
use demand_forecast::synthetic::seasonal_series;
use demand_forecast::{ForecastError, TimeSeries};
use demand_math::MathError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::{fixture, rstest};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

#[fixture]
fn weekly() -> TimeSeries {
    add_calendar_features(&seasonal_series(start(), 180, 11).unwrap()).unwrap()
}

fn ar1_series(phi: f64, n: usize) -> TimeSeries {
    let mut rng = StdRng::seed_from_u64(3);
    let mut values = Vec::with_capacity(n);
    let mut last = 0.0;
    for _ in 0..n {
        last = phi * last + rng.gen_range(-1.0..1.0);
        values.push(last);
    }
    let dates = (0..n).map(|i| start() + Duration::days(i as i64)).collect();
    TimeSeries::new(dates, values).unwrap()
}

#[rstest]
fn test_seasonal_adapter_end_to_end(weekly: TimeSeries) {
    let model = SeasonalModel::new((1, 0, 0), (1, 1, 0, 7), vec!["promo".to_string()]);

    let evaluation = evaluate(&model, &weekly, 30).unwrap();
    let result = &evaluation.result;

    assert_eq!(result.metric, ErrorMetric::Rmse);
    assert_eq!(result.predicted.len(), 30);
    assert_eq!(result.actual.len(), 30);
    assert_eq!(result.timestamps, weekly.timestamps()[150..].to_vec());
    assert!(result.predicted.iter().all(|p| p.is_finite()));
    assert!(result.value >= 0.0 && result.value < 20.0, "rmse {}", result.value);
}

#[rstest]
fn test_ensemble_adapter_end_to_end(weekly: TimeSeries) {
    let model = EnsembleModel::with_features(&["day_of_week", "promo"]);

    let evaluation = evaluate(&model, &weekly, 30).unwrap();
    let result = &evaluation.result;

    assert_eq!(result.metric, ErrorMetric::Mae);
    assert_eq!(result.predicted.len(), 30);
    assert_eq!(result.actual, weekly.values()[150..].to_vec());
    assert!(result.value < 5.0, "mae {}", result.value);

    let importances = evaluation.model.feature_importances();
    assert_eq!(importances.len(), 2);
    assert_abs_diff_eq!(
        importances.iter().map(|(_, v)| v).sum::<f64>(),
        1.0,
        epsilon = 1e-9
    );
}

#[rstest]
fn test_ensemble_is_reproducible(weekly: TimeSeries) {
    let model = EnsembleModel::with_features(&["day_of_week", "is_weekend", "promo"]);

    let first = evaluate(&model, &weekly, 30).unwrap();
    let second = evaluate(&model, &weekly, 30).unwrap();

    assert_eq!(first.result.predicted, second.result.predicted);
    assert_eq!(first.result.value, second.result.value);
}

#[test]
fn test_seasonal_adapter_recovers_ar1() {
    let series = ar1_series(0.6, 600);
    let model = SeasonalModel::new((1, 0, 0), (0, 0, 0, 0), Vec::new());

    let fitted = model.fit(&series).unwrap();

    assert_abs_diff_eq!(fitted.inner().ar_coefficients()[0], 0.6, epsilon = 0.1);
    assert_eq!(fitted.train_end(), series.last_timestamp().unwrap());
}

#[test]
fn test_singular_exogenous_design_fails_fitting() {
    let n = 60;
    let series = ar1_series(0.5, n)
        .with_feature("a", (0..n).map(|t| t as f64).collect())
        .unwrap()
        .with_feature("b", (0..n).map(|t| 2.0 * t as f64).collect())
        .unwrap();
    let model = SeasonalModel::new((1, 0, 0), (0, 0, 0, 0), vec!["a".into(), "b".into()]);

    match model.fit(&series) {
        Err(ForecastError::FittingFailed(MathError::SingularMatrix(_))) => {}
        other => panic!("expected FittingFailed, got {:?}", other),
    }
}

#[test]
fn test_seasonal_predict_rejects_misaligned_timestamps() {
    let series = ar1_series(0.5, 100);
    let fitted = SeasonalModel::new((1, 0, 0), (0, 0, 0, 0), Vec::new())
        .fit(&series)
        .unwrap();
    let end = fitted.train_end();

    let gap = vec![end + Duration::days(2), end + Duration::days(3)];
    assert!(matches!(
        fitted.predict(&gap, &[]),
        Err(ForecastError::Misaligned(_))
    ));

    let skipping = vec![end + Duration::days(1), end + Duration::days(3)];
    assert!(matches!(
        fitted.predict(&skipping, &[]),
        Err(ForecastError::Misaligned(_))
    ));

    let aligned = vec![end + Duration::days(1), end + Duration::days(2)];
    assert_eq!(fitted.predict(&aligned, &[]).unwrap().len(), 2);
}

#[rstest]
fn test_seasonal_predict_needs_one_regressor_row_per_day(weekly: TimeSeries) {
    let train = weekly.slice(0, Some(150));
    let fitted = SeasonalModel::new((1, 0, 0), (0, 1, 0, 7), vec!["promo".to_string()])
        .fit(&train)
        .unwrap();
    let end = fitted.train_end();

    let dates = vec![end + Duration::days(1), end + Duration::days(2)];
    assert!(matches!(
        fitted.predict(&dates, &[vec![0.0]]),
        Err(ForecastError::Misaligned(_))
    ));
}

#[test]
fn test_ensemble_without_features_is_rejected() {
    let model = EnsembleModel::new(Vec::new(), "y");
    assert!(matches!(
        model.fit(&ar1_series(0.5, 20)),
        Err(ForecastError::InvalidConfiguration(_))
    ));
}

#[rstest]
fn test_model_spec_dispatch(weekly: TimeSeries) {
    let specs: Vec<ModelSpec> = vec![
        SeasonalModel::new((1, 0, 0), (0, 1, 0, 7), vec!["promo".to_string()]).into(),
        EnsembleModel::with_features(&["day_of_week", "promo"]).into(),
    ];

    for spec in &specs {
        let evaluation = evaluate(spec, &weekly, 14).unwrap();
        assert_eq!(evaluation.result.predicted.len(), 14);
        assert_eq!(evaluation.model.name(), spec.name());
        match (spec, &evaluation.model) {
            (ModelSpec::Seasonal(_), FittedModel::Seasonal(_)) => {}
            (ModelSpec::Ensemble(_), FittedModel::Ensemble(_)) => {}
            _ => panic!("fitted variant does not match the ModelSpec variant"),
        }
    }
}

#[test]
fn test_evaluate_rejects_empty_parts() {
    let series = ar1_series(0.5, 10);
    let model = SeasonalModel::new((1, 0, 0), (0, 0, 0, 0), Vec::new());

    assert!(matches!(
        evaluate(&model, &series, 30),
        Err(ForecastError::InsufficientData(_))
    ));
}
