use approx::assert_relative_eq;
use chrono::NaiveDate;
use demand_forecast::evaluation::{ErrorMetric, EvaluationResult};
use demand_forecast::ForecastError;
use rstest::rstest;

fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    start.iter_days().take(n).collect()
}

#[rstest]
#[case(ErrorMetric::Mae, 0.667)]
#[case(ErrorMetric::Rmse, 0.816)]
fn test_metric_on_small_window(#[case] metric: ErrorMetric, #[case] expected: f64) {
    let actual = [10.0, 12.0, 8.0];
    let predicted = [9.0, 13.0, 8.0];

    let value = metric.score(&actual, &predicted).unwrap();

    assert_relative_eq!(value, expected, epsilon = 1e-3);
}

#[rstest]
#[case(ErrorMetric::Mae)]
#[case(ErrorMetric::Rmse)]
fn test_length_mismatch(#[case] metric: ErrorMetric) {
    let err = metric.score(&[1.0, 2.0, 3.0], &[1.0, 2.0]).unwrap_err();

    match err {
        ForecastError::LengthMismatch { actual, predicted } => {
            assert_eq!((actual, predicted), (3, 2));
        }
        other => panic!("expected LengthMismatch, got {:?}", other),
    }
}

#[test]
fn test_empty_window_is_insufficient() {
    assert!(matches!(
        ErrorMetric::Mae.score(&[], &[]),
        Err(ForecastError::InsufficientData(_))
    ));
}

#[test]
fn test_result_keeps_series_aligned() {
    let result = EvaluationResult::new(
        ErrorMetric::Mae,
        dates(3),
        vec![10.0, 12.0, 8.0],
        vec![9.0, 13.0, 8.0],
    )
    .unwrap();

    assert_eq!(result.residuals(), vec![1.0, -1.0, 0.0]);
    assert_eq!(
        result.to_string(),
        "MAE: 0.6667 over 3 days (2024-05-01 to 2024-05-03)"
    );

    let misaligned = EvaluationResult::new(ErrorMetric::Mae, dates(2), vec![1.0; 3], vec![1.0; 3]);
    assert!(matches!(misaligned, Err(ForecastError::Misaligned(_))));
}

#[test]
fn test_result_serializes_to_json() {
    let result =
        EvaluationResult::new(ErrorMetric::Rmse, dates(2), vec![1.0, 2.0], vec![1.5, 2.5]).unwrap();

    let json = result.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["metric"], "rmse");
    assert_eq!(value["timestamps"][0], "2024-05-01");
    assert_relative_eq!(value["value"].as_f64().unwrap(), 0.5, epsilon = 1e-12);

    let back: EvaluationResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}
