//! Order cleaning, daily demand aggregation and daily resampling

use crate::data::{column_as_dates, column_as_f64, parse_calendar_date, DataLoader};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Order status counted as fulfilled demand unless configured otherwise
pub const DEFAULT_FULFILLED_STATUS: &str = "Delivered";

/// One row of the raw order file, as read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOrder {
    pub date: Option<String>,
    pub order_status: Option<String>,
    pub sku: Option<String>,
    pub quantity: Option<f64>,
    /// Cells of every other column (order ids and the like), in file order.
    /// Two rows are duplicates only if these match too.
    #[serde(skip)]
    pub extra: Vec<String>,
}

/// A complete order with its timestamp truncated to the calendar date
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub date: NaiveDate,
    pub order_status: String,
    pub sku: String,
    pub quantity: f64,
}

/// Total fulfilled quantity of one SKU on one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDemand {
    pub date: NaiveDate,
    pub sku: String,
    pub total_quantity: f64,
}

/// A calendar date and a possibly missing value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyValue {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl DailyValue {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value: Some(value),
        }
    }

    pub fn missing(date: NaiveDate) -> Self {
        Self { date, value: None }
    }
}

/// Which cleaning steps to apply before aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningPolicy {
    /// Drop rows with any missing field
    pub drop_nulls: bool,
    /// Drop rows identical in every field to an earlier row
    pub drop_duplicates: bool,
}

impl Default for CleaningPolicy {
    fn default() -> Self {
        Self {
            drop_nulls: true,
            drop_duplicates: true,
        }
    }
}

/// Inputs to [`generate_daily_demand`] besides the file paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSettings {
    /// Status value counted as demand
    pub fulfilled_status: String,
    pub cleaning: CleaningPolicy,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            fulfilled_status: DEFAULT_FULFILLED_STATUS.to_string(),
            cleaning: CleaningPolicy::default(),
        }
    }
}

/// Row counts seen by a cleaning pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub dropped_nulls: usize,
    pub dropped_duplicates: usize,
    pub output_rows: usize,
}

/// Method used to fill dates missing from a daily series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMethod {
    /// Carry the last known value forward
    ForwardFill,
    /// Carry the next known value backward
    BackwardFill,
    /// Treat missing days as zero
    ZeroFill,
}

impl FillMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillMethod::ForwardFill => "ffill",
            FillMethod::BackwardFill => "bfill",
            FillMethod::ZeroFill => "zero",
        }
    }
}

impl FromStr for FillMethod {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ffill" | "forward" => Ok(FillMethod::ForwardFill),
            "bfill" | "backward" => Ok(FillMethod::BackwardFill),
            "zero" => Ok(FillMethod::ZeroFill),
            _ => Err(ForecastError::InvalidConfiguration(format!(
                "Unknown fill method '{}', expected one of ffill, bfill, zero",
                s
            ))),
        }
    }
}

impl fmt::Display for FillMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RawOrder {
    /// True when every field is present
    pub fn is_complete(&self) -> bool {
        self.date.is_some()
            && self.order_status.is_some()
            && self.sku.is_some()
            && self.quantity.is_some()
    }

    #[allow(clippy::type_complexity)]
    fn dedup_key(&self) -> (Option<String>, Option<String>, Option<String>, Option<u64>, Vec<String>) {
        (
            self.date.clone(),
            self.order_status.clone(),
            self.sku.clone(),
            self.quantity.map(f64::to_bits),
            self.extra.clone(),
        )
    }

    /// Parse into a typed record, or `None` if a field is missing
    pub fn to_record(&self) -> Result<Option<OrderRecord>> {
        match (&self.date, &self.order_status, &self.sku, self.quantity) {
            (Some(date), Some(status), Some(sku), Some(quantity)) => Ok(Some(OrderRecord {
                date: parse_calendar_date(date)?,
                order_status: status.clone(),
                sku: sku.clone(),
                quantity,
            })),
            _ => Ok(None),
        }
    }
}

/// Drop incomplete rows, then exact duplicates keeping the first occurrence
pub fn clean_rows<T, K, C, F>(
    rows: Vec<T>,
    policy: &CleaningPolicy,
    is_complete: C,
    key: F,
) -> (Vec<T>, CleaningReport)
where
    C: Fn(&T) -> bool,
    F: Fn(&T) -> K,
    K: Hash + Eq,
{
    let input_rows = rows.len();

    let rows: Vec<T> = if policy.drop_nulls {
        rows.into_iter().filter(|r| is_complete(r)).collect()
    } else {
        rows
    };
    let dropped_nulls = input_rows - rows.len();

    let before_dedup = rows.len();
    let rows: Vec<T> = if policy.drop_duplicates {
        let mut seen = HashSet::new();
        rows.into_iter().filter(|r| seen.insert(key(r))).collect()
    } else {
        rows
    };
    let dropped_duplicates = before_dedup - rows.len();

    let report = CleaningReport {
        input_rows,
        dropped_nulls,
        dropped_duplicates,
        output_rows: rows.len(),
    };
    (rows, report)
}

/// Clean raw order rows
pub fn clean_orders(orders: Vec<RawOrder>, policy: &CleaningPolicy) -> (Vec<RawOrder>, CleaningReport) {
    let (orders, report) = clean_rows(orders, policy, RawOrder::is_complete, RawOrder::dedup_key);
    debug!(
        dropped_nulls = report.dropped_nulls,
        dropped_duplicates = report.dropped_duplicates,
        remaining = report.output_rows,
        "cleaned orders"
    );
    (orders, report)
}

/// Sum fulfilled quantity per (date, SKU), ordered by SKU then date
pub fn aggregate_demand_by_sku(orders: &[OrderRecord], fulfilled_status: &str) -> Vec<DailyDemand> {
    let mut totals: BTreeMap<(&str, NaiveDate), f64> = BTreeMap::new();
    for order in orders.iter().filter(|o| o.order_status == fulfilled_status) {
        *totals.entry((order.sku.as_str(), order.date)).or_insert(0.0) += order.quantity;
    }

    totals
        .into_iter()
        .map(|((sku, date), total_quantity)| DailyDemand {
            date,
            sku: sku.to_string(),
            total_quantity,
        })
        .collect()
}

/// Load orders, clean them, aggregate fulfilled demand per SKU and day and
/// optionally write the result to `output`
pub fn generate_daily_demand<P: AsRef<Path>>(
    input: P,
    output: Option<&Path>,
    settings: &AggregationSettings,
) -> Result<(Vec<DailyDemand>, CleaningReport)> {
    let raw = DataLoader::load_orders(input)?;
    let (raw, report) = clean_orders(raw, &settings.cleaning);

    let mut records = Vec::with_capacity(raw.len());
    let mut incomplete = 0usize;
    for order in &raw {
        match order.to_record()? {
            Some(record) => records.push(record),
            None => incomplete += 1,
        }
    }
    if incomplete > 0 {
        warn!(rows = incomplete, "skipping orders with missing fields");
    }

    let demand = aggregate_demand_by_sku(&records, &settings.fulfilled_status);
    info!(
        orders = records.len(),
        daily_rows = demand.len(),
        status = %settings.fulfilled_status,
        "aggregated daily demand"
    );

    if let Some(path) = output {
        DataLoader::write_daily_demand(path, &demand)?;
    }
    Ok((demand, report))
}

/// Daily demand of one SKU, in date order
pub fn demand_for_sku(rows: &[DailyDemand], sku: &str) -> Vec<DailyValue> {
    let mut values: Vec<DailyValue> = rows
        .iter()
        .filter(|r| r.sku == sku)
        .map(|r| DailyValue::new(r.date, r.total_quantity))
        .collect();
    values.sort_by_key(|v| v.date);
    values
}

/// Sum `value_column` per calendar date of `date_column`.
///
/// Rows with a null date are dropped and null values count as zero, so a
/// date whose values are all null sums to `0.0`.
pub fn aggregate_daily(df: &DataFrame, date_column: &str, value_column: &str) -> Result<Vec<DailyValue>> {
    let dates = column_as_dates(df, date_column)?;
    let values = column_as_f64(df, value_column)?;

    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, value) in dates.into_iter().zip(values) {
        if let Some(date) = date {
            *totals.entry(date).or_insert(0.0) += value.unwrap_or(0.0);
        }
    }

    Ok(totals
        .into_iter()
        .map(|(date, total)| DailyValue::new(date, total))
        .collect())
}

/// Reindex to every date between the first and last observation and fill
/// the gaps.
///
/// Repeated dates are summed first. Forward fill leaves leading gaps
/// missing and backward fill leaves trailing gaps missing.
pub fn resample_to_daily(values: &[DailyValue], method: FillMethod) -> Vec<DailyValue> {
    let mut by_date: BTreeMap<NaiveDate, Option<f64>> = BTreeMap::new();
    for point in values {
        let slot = by_date.entry(point.date).or_insert(None);
        if let Some(v) = point.value {
            *slot = Some(slot.unwrap_or(0.0) + v);
        }
    }

    let (first, last) = match (by_date.keys().next(), by_date.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Vec::new(),
    };

    let mut daily: Vec<DailyValue> = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| DailyValue {
            date,
            value: by_date.get(&date).copied().flatten(),
        })
        .collect();

    match method {
        FillMethod::ForwardFill => {
            let mut carry = None;
            for point in daily.iter_mut() {
                match point.value {
                    Some(v) => carry = Some(v),
                    None => point.value = carry,
                }
            }
        }
        FillMethod::BackwardFill => {
            let mut carry = None;
            for point in daily.iter_mut().rev() {
                match point.value {
                    Some(v) => carry = Some(v),
                    None => point.value = carry,
                }
            }
        }
        FillMethod::ZeroFill => {
            for point in daily.iter_mut() {
                point.value.get_or_insert(0.0);
            }
        }
    }

    daily
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn raw(date: &str, status: &str, sku: &str, quantity: Option<f64>) -> RawOrder {
        RawOrder {
            date: Some(date.to_string()),
            order_status: Some(status.to_string()),
            sku: Some(sku.to_string()),
            quantity,
            extra: Vec::new(),
        }
    }

    #[test]
    fn test_fill_method_parsing() {
        assert_eq!("ffill".parse::<FillMethod>().unwrap(), FillMethod::ForwardFill);
        assert_eq!("backward".parse::<FillMethod>().unwrap(), FillMethod::BackwardFill);
        assert_eq!("zero".parse::<FillMethod>().unwrap(), FillMethod::ZeroFill);

        match "interpolate".parse::<FillMethod>() {
            Err(ForecastError::InvalidConfiguration(msg)) => assert!(msg.contains("interpolate")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_clean_orders_counts() {
        let orders = vec![
            raw("2024-01-01", "Delivered", "A", Some(1.0)),
            raw("2024-01-01", "Delivered", "A", Some(1.0)),
            raw("2024-01-01", "Delivered", "B", None),
            raw("2024-01-02", "Delivered", "A", Some(2.0)),
        ];

        let (clean, report) = clean_orders(orders, &CleaningPolicy::default());
        assert_eq!(clean.len(), 2);
        assert_eq!(
            report,
            CleaningReport {
                input_rows: 4,
                dropped_nulls: 1,
                dropped_duplicates: 1,
                output_rows: 2,
            }
        );
    }

    #[test]
    fn test_rows_differing_only_in_extra_columns_are_kept() {
        let mut first = raw("2024-01-01", "Delivered", "A", Some(2.0));
        first.extra = vec!["1".to_string()];
        let mut second = first.clone();
        second.extra = vec!["2".to_string()];

        let (clean, report) = clean_orders(vec![first.clone(), second, first], &CleaningPolicy::default());
        assert_eq!(clean.len(), 2);
        assert_eq!(report.dropped_duplicates, 1);
    }

    #[test]
    fn test_resample_fills_gaps() {
        let values = vec![
            DailyValue::new(date("2024-01-01"), 1.0),
            DailyValue::new(date("2024-01-03"), 3.0),
        ];

        let filled = resample_to_daily(&values, FillMethod::ForwardFill);
        let ys: Vec<Option<f64>> = filled.iter().map(|v| v.value).collect();
        assert_eq!(ys, vec![Some(1.0), Some(1.0), Some(3.0)]);

        let filled = resample_to_daily(&values, FillMethod::ZeroFill);
        assert_eq!(filled[1].value, Some(0.0));
    }
}
