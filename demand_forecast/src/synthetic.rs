//! Seeded synthetic data for demos and tests

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::preprocessing::{RawOrder, DEFAULT_FULFILLED_STATUS};
use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Normal, Poisson};
use tracing::debug;

/// Relative demand per weekday, Monday first
const WEEKLY_PROFILE: [f64; 7] = [0.9, 0.85, 0.9, 1.0, 1.15, 1.3, 1.1];

/// Statuses given to orders that are not fulfilled
const OTHER_STATUSES: [&str; 3] = ["Cancelled", "Returned", "Shipped"];

/// Generator of raw order tables with a weekly pattern and dirty rows
#[derive(Debug, Clone)]
pub struct SyntheticOrders {
    pub start: NaiveDate,
    pub days: usize,
    pub skus: Vec<String>,
    /// Mean number of orders per SKU on an average day
    pub orders_per_day: f64,
    /// Share of orders with a status other than delivered
    pub unfulfilled_rate: f64,
    /// Share of rows emitted twice
    pub duplicate_rate: f64,
    /// Share of rows with the quantity left empty
    pub missing_rate: f64,
    pub seed: u64,
}

impl Default for SyntheticOrders {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            days: 180,
            skus: vec!["SKU1".to_string(), "SKU2".to_string()],
            orders_per_day: 12.0,
            unfulfilled_rate: 0.15,
            duplicate_rate: 0.02,
            missing_rate: 0.01,
            seed: 42,
        }
    }
}

impl SyntheticOrders {
    /// Generate order rows. Dates carry a time of day.
    pub fn generate(&self) -> Result<Vec<RawOrder>> {
        for (name, rate) in [
            ("unfulfilled_rate", self.unfulfilled_rate),
            ("duplicate_rate", self.duplicate_rate),
            ("missing_rate", self.missing_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ForecastError::InvalidConfiguration(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut orders = Vec::new();

        for day in 0..self.days {
            let date = self.start + Duration::days(day as i64);
            let weekday = date.weekday().num_days_from_monday() as usize;

            for sku in &self.skus {
                let lambda = self.orders_per_day * WEEKLY_PROFILE[weekday];
                let poisson = Poisson::new(lambda)
                    .map_err(|e| ForecastError::InvalidConfiguration(e.to_string()))?;
                let count: f64 = rng.sample(poisson);

                for _ in 0..count as usize {
                    let status = if rng.gen_bool(self.unfulfilled_rate) {
                        OTHER_STATUSES[rng.gen_range(0..OTHER_STATUSES.len())]
                    } else {
                        DEFAULT_FULFILLED_STATUS
                    };
                    let quantity = if rng.gen_bool(self.missing_rate) {
                        None
                    } else {
                        Some(f64::from(rng.gen_range(1u32..=4)))
                    };

                    let order = RawOrder {
                        date: Some(format!(
                            "{} {:02}:{:02}:00",
                            date,
                            rng.gen_range(8..22),
                            rng.gen_range(0..60)
                        )),
                        order_status: Some(status.to_string()),
                        sku: Some(sku.clone()),
                        quantity,
                        extra: Vec::new(),
                    };
                    if rng.gen_bool(self.duplicate_rate) {
                        orders.push(order.clone());
                    }
                    orders.push(order);
                }
            }
        }

        debug!(rows = orders.len(), days = self.days, "generated synthetic orders");
        Ok(orders)
    }
}

/// Daily series with a weekly cycle, a `promo` regressor that lifts demand
/// on two days out of every fourteen, and Gaussian noise
pub fn seasonal_series(start: NaiveDate, days: usize, seed: u64) -> Result<TimeSeries> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise =
        Normal::new(0.0, 2.0).map_err(|e| ForecastError::InvalidConfiguration(e.to_string()))?;

    let mut timestamps = Vec::with_capacity(days);
    let mut values = Vec::with_capacity(days);
    let mut promo = Vec::with_capacity(days);

    for day in 0..days {
        let date = start + Duration::days(day as i64);
        let weekday = date.weekday().num_days_from_monday() as usize;
        let on_promo = if day % 14 < 2 { 1.0 } else { 0.0 };

        timestamps.push(date);
        promo.push(on_promo);
        values.push(50.0 * WEEKLY_PROFILE[weekday] + 15.0 * on_promo + rng.sample(noise));
    }

    TimeSeries::new(timestamps, values)?.with_feature("promo", promo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_seeded() {
        let generator = SyntheticOrders {
            days: 14,
            ..SyntheticOrders::default()
        };
        let first = generator.generate().unwrap();
        let second = generator.generate().unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_bad_rate() {
        let generator = SyntheticOrders {
            missing_rate: 1.5,
            ..SyntheticOrders::default()
        };
        assert!(matches!(
            generator.generate(),
            Err(ForecastError::InvalidConfiguration(_))
        ));
    }
}
