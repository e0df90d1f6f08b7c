use rust_decimal::Decimal;
use thiserror::Error;

/// Failures of the sizing engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HedgeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Contract value is zero at index price {index_price}, required lots are undefined")]
    DivisionInvalid { index_price: Decimal },
}
