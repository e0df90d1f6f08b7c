//! Indicator calculations feeding the hedge signal.

mod calculator;

pub use calculator::IndicatorCalculator;
