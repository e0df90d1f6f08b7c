//! Market levels for the hedging index and the futures contract spec.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Index level and its moving average for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketLevel {
    /// Latest index close (points)
    pub index_price: Decimal,

    /// Trailing simple moving average of the index (points)
    pub moving_average_price: Decimal,

    /// Window the moving average was computed over
    pub period_days: u32,
}

impl MarketLevel {
    pub fn new(index_price: Decimal, moving_average_price: Decimal, period_days: u32) -> Self {
        Self {
            index_price,
            moving_average_price,
            period_days,
        }
    }

    /// Signed distance of the index from its moving average, in points.
    pub fn spread(&self) -> Decimal {
        self.index_price - self.moving_average_price
    }
}

/// Hedging instrument specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
    /// Currency value of one index point for one contract
    pub point_value: Decimal,
}

impl ContractSpec {
    /// Mini index future, 50 per point.
    pub const MINI_INDEX: ContractSpec = ContractSpec {
        point_value: dec!(50),
    };

    /// Value of one contract at the given index level.
    pub fn contract_value(&self, index_price: Decimal) -> Decimal {
        index_price * self.point_value
    }
}

impl Default for ContractSpec {
    fn default() -> Self {
        Self::MINI_INDEX
    }
}
