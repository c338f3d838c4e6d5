//! Date-based train/test splitting

use crate::data::TimeSeries;
use chrono::{Duration, NaiveDate};
use tracing::debug;

/// Training and test partitions of a series
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub train: TimeSeries,
    pub test: TimeSeries,
    /// Last date kept in the training part, `None` for an empty series
    pub cutoff: Option<NaiveDate>,
}

/// Hold out the final `test_days` days.
///
/// The cutoff is the last timestamp minus `test_days` days. Rows dated on or
/// before the cutoff train, later rows test. Gaps in the index can leave
/// fewer than `test_days` test rows, and a series spanning fewer days leaves
/// the training part empty. A window reaching past the earliest
/// representable date puts every row in the test part. An empty series
/// splits into two empty parts.
pub fn temporal_split(series: &TimeSeries, test_days: u32) -> SplitResult {
    let cutoff = series
        .last_timestamp()
        .map(|last| {
            last.checked_sub_signed(Duration::days(i64::from(test_days)))
                .unwrap_or(NaiveDate::MIN)
        });

    let (train, test) = series.split_at_date(cutoff.unwrap_or(NaiveDate::MIN));

    debug!(
        cutoff = ?cutoff,
        train_rows = train.len(),
        test_rows = test.len(),
        "temporal split"
    );

    SplitResult {
        train,
        test,
        cutoff,
    }
}
