//! Tabular features derived from a daily series

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use chrono::Datelike;

/// Add `day_of_week` (Monday = 0), `day_of_month`, `month` and `is_weekend`
pub fn add_calendar_features(series: &TimeSeries) -> Result<TimeSeries> {
    let dates = series.timestamps();

    let day_of_week = dates
        .iter()
        .map(|d| f64::from(d.weekday().num_days_from_monday()))
        .collect();
    let day_of_month = dates.iter().map(|d| f64::from(d.day())).collect();
    let month = dates.iter().map(|d| f64::from(d.month())).collect();
    let is_weekend = dates
        .iter()
        .map(|d| if d.weekday().num_days_from_monday() >= 5 { 1.0 } else { 0.0 })
        .collect();

    series
        .clone()
        .with_feature("day_of_week", day_of_week)?
        .with_feature("day_of_month", day_of_month)?
        .with_feature("month", month)?
        .with_feature("is_weekend", is_weekend)
}

/// Add `lag_{lag}` holding the target value `lag` days earlier. The first
/// `lag` rows have no such value and are dropped.
pub fn add_lag_feature(series: &TimeSeries, lag: usize) -> Result<TimeSeries> {
    check_window(series, lag, "Lag")?;

    let values = series.values();
    let mut lagged = vec![0.0; lag];
    lagged.extend_from_slice(&values[..values.len() - lag]);

    Ok(series
        .clone()
        .with_feature(&format!("lag_{}", lag), lagged)?
        .slice(lag, None))
}

/// Add `rolling_mean_{window}`, the mean of the `window` preceding target
/// values. The current value is excluded so the feature is known at
/// prediction time. The first `window` rows are dropped.
pub fn add_rolling_mean(series: &TimeSeries, window: usize) -> Result<TimeSeries> {
    check_window(series, window, "Window")?;

    let values = series.values();
    let mut means = vec![0.0; window];
    means.extend(
        values
            .windows(window)
            .take(values.len() - window)
            .map(|w| w.iter().sum::<f64>() / window as f64),
    );

    Ok(series
        .clone()
        .with_feature(&format!("rolling_mean_{}", window), means)?
        .slice(window, None))
}

fn check_window(series: &TimeSeries, size: usize, what: &str) -> Result<()> {
    if size == 0 {
        return Err(ForecastError::InvalidConfiguration(format!(
            "{} must be positive",
            what
        )));
    }
    if !series.is_contiguous() {
        return Err(ForecastError::DataError(
            "Lagged features need a gap-free daily series; resample first".to_string(),
        ));
    }
    if series.len() <= size {
        return Err(ForecastError::InsufficientData(format!(
            "{} of {} needs more than {} rows",
            what,
            size,
            series.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        TimeSeries::new(dates, values.to_vec()).unwrap()
    }

    #[test]
    fn test_calendar_features() {
        // 2024-01-01 is a Monday
        let s = add_calendar_features(&series(&[1.0; 7])).unwrap();
        assert_eq!(
            s.column("day_of_week").unwrap(),
            &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
        assert_eq!(
            s.column("is_weekend").unwrap(),
            &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0]
        );
        assert_eq!(s.column("month").unwrap()[0], 1.0);
    }

    #[test]
    fn test_lag_and_rolling_mean() {
        let s = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let lagged = add_lag_feature(&s, 2).unwrap();
        assert_eq!(lagged.len(), 3);
        assert_eq!(lagged.column("lag_2").unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(lagged.values(), &[3.0, 4.0, 5.0]);

        let rolled = add_rolling_mean(&s, 2).unwrap();
        assert_eq!(rolled.column("rolling_mean_2").unwrap(), &[1.5, 2.5, 3.5]);

        assert!(add_lag_feature(&s, 0).is_err());
        assert!(add_lag_feature(&s, 5).is_err());
    }
}
