//! Trend indicators over daily closing prices.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::Statistics;

/// Calculator for the moving-average trend filter.
pub struct IndicatorCalculator;

impl IndicatorCalculator {
    /// Trailing simple moving average of the last `period` closes.
    ///
    /// Returns `None` when `period` is zero or fewer than `period` closes exist.
    pub fn simple_moving_average(closes: &[Decimal], period: usize) -> Option<Decimal> {
        if period == 0 || closes.len() < period {
            return None;
        }

        let window: Vec<f64> = closes[closes.len() - period..]
            .iter()
            .map(|c| c.to_f64())
            .collect::<Option<Vec<_>>>()?;

        let mean = window.mean();
        if !mean.is_finite() {
            return None;
        }

        Decimal::try_from(mean).ok()
    }

    /// Latest close and its trailing moving average, both rounded to whole points.
    pub fn latest_with_moving_average(
        closes: &[Decimal],
        period: usize,
    ) -> Option<(Decimal, Decimal)> {
        let latest = *closes.last()?;
        let ma = Self::simple_moving_average(closes, period)?;
        Some((latest.round(), ma.round()))
    }
}
