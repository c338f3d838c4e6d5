//! Time series data handling and file I/O

use crate::error::{ForecastError, Result};
use crate::preprocessing::{DailyDemand, DailyValue, RawOrder};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Columns the order file must provide
pub const ORDER_COLUMNS: [&str; 4] = ["date", "order_status", "sku", "quantity"];

/// Name of the target column in a [`TimeSeries`]
pub const VALUE_COLUMN: &str = "y";

/// Daily time series: one target value and any number of named feature
/// columns per date. Dates are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestamps: Vec<NaiveDate>,
    values: Vec<f64>,
    features: Vec<(String, Vec<f64>)>,
}

/// Data loader for tabular files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load any CSV file into a DataFrame
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let file = File::open(path.as_ref())?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        debug!(
            path = %path.as_ref().display(),
            rows = df.height(),
            columns = df.width(),
            "loaded csv"
        );
        Ok(df)
    }

    /// Load raw order rows. Empty cells become missing fields and cells of
    /// any other column are kept in [`RawOrder::extra`].
    pub fn load_orders<P: AsRef<Path>>(path: P) -> Result<Vec<RawOrder>> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;

        let headers = reader.headers()?.clone();
        for required in ORDER_COLUMNS {
            if !headers.iter().any(|h| h.trim() == required) {
                return Err(ForecastError::ColumnNotFound(required.to_string()));
            }
        }

        let extra_columns: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !ORDER_COLUMNS.contains(&h.trim()))
            .map(|(i, _)| i)
            .collect();

        let mut orders = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut order: RawOrder = record.deserialize(Some(&headers))?;
            order.extra = extra_columns
                .iter()
                .map(|&i| record.get(i).unwrap_or_default().to_string())
                .collect();
            orders.push(order);
        }

        info!(path = %path.as_ref().display(), rows = orders.len(), "loaded orders");
        Ok(orders)
    }

    /// Write raw order rows, e.g. generated ones, to a CSV file
    pub fn write_orders<P: AsRef<Path>>(path: P, orders: &[RawOrder]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for order in orders {
            writer.serialize(order)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Persist aggregated demand as `date,sku,total_quantity`
    pub fn write_daily_demand<P: AsRef<Path>>(path: P, rows: &[DailyDemand]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!(path = %path.as_ref().display(), rows = rows.len(), "wrote daily demand");
        Ok(())
    }

    /// Read a file previously written by [`DataLoader::write_daily_demand`]
    pub fn load_daily_demand<P: AsRef<Path>>(path: P) -> Result<Vec<DailyDemand>> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<DailyDemand>, csv::Error>>()?;
        Ok(rows)
    }
}

impl TimeSeries {
    /// Create a series without feature columns
    pub fn new(timestamps: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "{} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(w) = timestamps.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ForecastError::DataError(format!(
                "Timestamps must be strictly increasing: {} is followed by {}",
                w[0], w[1]
            )));
        }

        Ok(Self {
            timestamps,
            values,
            features: Vec::new(),
        })
    }

    /// An empty series carrying the same feature column names
    fn empty_like(&self) -> Self {
        Self {
            timestamps: Vec::new(),
            values: Vec::new(),
            features: self
                .features
                .iter()
                .map(|(name, _)| (name.clone(), Vec::new()))
                .collect(),
        }
    }

    /// Add (or replace) a named feature column
    pub fn with_feature(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        if name == VALUE_COLUMN {
            return Err(ForecastError::DataError(format!(
                "'{}' is reserved for the target column",
                VALUE_COLUMN
            )));
        }
        if values.len() != self.len() {
            return Err(ForecastError::DataError(format!(
                "Feature '{}' has {} values, series has {} rows",
                name,
                values.len(),
                self.len()
            )));
        }

        match self.features.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = values,
            None => self.features.push((name.to_string(), values)),
        }
        Ok(self)
    }

    /// Build a series from resampled daily values
    pub fn from_daily(values: &[DailyValue]) -> Result<Self> {
        let mut timestamps = Vec::with_capacity(values.len());
        let mut ys = Vec::with_capacity(values.len());
        for point in values {
            let value = point.value.ok_or_else(|| {
                ForecastError::DataError(format!("Missing value on {}", point.date))
            })?;
            timestamps.push(point.date);
            ys.push(value);
        }
        Self::new(timestamps, ys)
    }

    /// Build a series from a DataFrame.
    ///
    /// Rows are ordered by date; a null date or value, or a repeated date, is
    /// a data error.
    pub fn from_dataframe(
        df: &DataFrame,
        time_column: &str,
        value_column: &str,
        feature_columns: &[&str],
    ) -> Result<Self> {
        let dates = column_as_dates(df, time_column)?;
        let values = column_as_f64(df, value_column)?;
        let features = feature_columns
            .iter()
            .map(|name| column_as_f64(df, name).map(|v| (name.to_string(), v)))
            .collect::<Result<Vec<_>>>()?;

        let mut order: Vec<usize> = (0..df.height()).collect();
        let mut keyed_dates = Vec::with_capacity(dates.len());
        for (row, date) in dates.iter().enumerate() {
            keyed_dates.push(date.ok_or_else(|| {
                ForecastError::DataError(format!("Null date in row {}", row))
            })?);
        }
        order.sort_by_key(|&i| keyed_dates[i]);

        let pick = |column: &[Option<f64>], name: &str| -> Result<Vec<f64>> {
            order
                .iter()
                .map(|&i| {
                    column[i].ok_or_else(|| {
                        ForecastError::DataError(format!(
                            "Null value in column '{}' on {}",
                            name, keyed_dates[i]
                        ))
                    })
                })
                .collect()
        };

        let timestamps: Vec<NaiveDate> = order.iter().map(|&i| keyed_dates[i]).collect();
        let mut series = Self::new(timestamps, pick(&values, value_column)?)?;
        for (name, column) in &features {
            let column = pick(column, name)?;
            series = series.with_feature(name, column)?;
        }
        Ok(series)
    }

    /// Convert to a DataFrame with a `date` column, `y` and the features
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let days: Vec<i32> = self
            .timestamps
            .iter()
            .map(|d| (*d - unix_epoch()).num_days() as i32)
            .collect();

        let mut columns = vec![
            Series::new("date", days).cast(&DataType::Date)?,
            Series::new(VALUE_COLUMN, self.values.as_slice()),
        ];
        for (name, values) in &self.features {
            columns.push(Series::new(name.as_str(), values.as_slice()));
        }

        Ok(DataFrame::new(columns)?)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    /// Target values (`y`)
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_timestamp(&self) -> Option<NaiveDate> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDate> {
        self.timestamps.last().copied()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Look up a column by name; `y` is the target
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        if name == VALUE_COLUMN {
            return Ok(&self.values);
        }
        self.features
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .ok_or_else(|| ForecastError::ColumnNotFound(name.to_string()))
    }

    /// Row-major matrix of the named columns
    pub fn rows<S: AsRef<str>>(&self, columns: &[S]) -> Result<Vec<Vec<f64>>> {
        let selected = columns
            .iter()
            .map(|name| self.column(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..self.len())
            .map(|i| selected.iter().map(|col| col[i]).collect())
            .collect())
    }

    /// Target value on a given date
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.timestamps
            .binary_search(&date)
            .ok()
            .map(|i| self.values[i])
    }

    /// True when consecutive timestamps are exactly one day apart
    pub fn is_contiguous(&self) -> bool {
        self.timestamps
            .windows(2)
            .all(|w| w[1] - w[0] == Duration::days(1))
    }

    /// Rows `start..end` (end defaults to the series length)
    pub fn slice(&self, start: usize, end: Option<usize>) -> Self {
        let end = end.unwrap_or(self.len()).min(self.len());
        let start = start.min(end);

        Self {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            features: self
                .features
                .iter()
                .map(|(name, v)| (name.clone(), v[start..end].to_vec()))
                .collect(),
        }
    }

    /// Split into rows dated on or before `cutoff` and rows after it
    pub fn split_at_date(&self, cutoff: NaiveDate) -> (Self, Self) {
        if self.is_empty() {
            return (self.empty_like(), self.empty_like());
        }
        let boundary = self.timestamps.partition_point(|d| *d <= cutoff);
        (self.slice(0, Some(boundary)), self.slice(boundary, None))
    }
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Parse a calendar date, dropping any time-of-day component
pub fn parse_calendar_date(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(datetime.date());
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Ok(datetime.date_naive());
    }

    Err(ForecastError::DataError(format!(
        "Unparseable date '{}'",
        raw
    )))
}

/// Read a date-like column (Date, Datetime or text) as calendar dates
pub(crate) fn column_as_dates(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    let col = df
        .column(name)
        .map_err(|_| ForecastError::ColumnNotFound(name.to_string()))?;

    match col.dtype() {
        DataType::Date => Ok(col
            .date()?
            .into_iter()
            .map(|opt| opt.map(|days| unix_epoch() + Duration::days(days as i64)))
            .collect()),
        DataType::Datetime(unit, _) => {
            let per_day: i64 = match unit {
                TimeUnit::Nanoseconds => 86_400_000_000_000,
                TimeUnit::Microseconds => 86_400_000_000,
                TimeUnit::Milliseconds => 86_400_000,
            };
            Ok(col
                .datetime()?
                .into_iter()
                .map(|opt| {
                    opt.map(|ts| unix_epoch() + Duration::days(ts.div_euclid(per_day)))
                })
                .collect())
        }
        DataType::Utf8 => col
            .utf8()?
            .into_iter()
            .map(|opt| opt.map(parse_calendar_date).transpose())
            .collect(),
        other => Err(ForecastError::DataError(format!(
            "Column '{}' of type {} cannot be read as dates",
            name, other
        ))),
    }
}

/// Read a numeric column as f64, keeping nulls
pub(crate) fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = df
        .column(name)
        .map_err(|_| ForecastError::ColumnNotFound(name.to_string()))?;

    if !col.dtype().is_numeric() && col.dtype() != &DataType::Boolean {
        return Err(ForecastError::DataError(format!(
            "Column '{}' cannot be converted to f64",
            name
        )));
    }

    let casted = col.cast(&DataType::Float64)?;
    let values = casted.f64()?.into_iter().collect();
    Ok(values)
}
