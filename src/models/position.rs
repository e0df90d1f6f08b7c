//! Position model for the leveraged ETF holding and its declared hedge state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Leveraged ETF holding being hedged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Number of lots held (one lot = `shares_per_lot` shares)
    pub holding_lots: u32,

    /// Latest price per share
    pub unit_price: Decimal,
}

impl Position {
    pub fn new(holding_lots: u32, unit_price: Decimal) -> Self {
        Self {
            holding_lots,
            unit_price,
        }
    }
}

/// Whether the holder currently carries a short futures hedge.
///
/// Declared by the operator on every evaluation; never derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HedgeState {
    /// Long the ETF only
    #[default]
    Unhedged,
    /// Long the ETF plus short index futures
    Hedged,
}

impl HedgeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HedgeState::Unhedged => "unhedged",
            HedgeState::Hedged => "hedged",
        }
    }

    pub fn from_flag(hedged: bool) -> Self {
        if hedged {
            HedgeState::Hedged
        } else {
            HedgeState::Unhedged
        }
    }
}

impl fmt::Display for HedgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HedgeState::Unhedged => write!(f, "Long ETF, unhedged"),
            HedgeState::Hedged => write!(f, "Long ETF + short futures (hedged)"),
        }
    }
}

impl FromStr for HedgeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unhedged" | "u" | "long" => Ok(HedgeState::Unhedged),
            "hedged" | "h" | "short" => Ok(HedgeState::Hedged),
            other => Err(format!("unknown hedge state '{}', use hedged or unhedged", other)),
        }
    }
}
