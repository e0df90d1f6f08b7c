//! Derived results of one hedge evaluation: sizing figures and the recommended action.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sizing figures for one (position, index level) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingResult {
    /// Face value of the holding before leverage
    pub notional_value_1x: Decimal,

    /// Notional scaled by the ETF's leverage ratio
    pub effective_exposure: Decimal,

    /// Value of one futures contract at the current index level
    pub contract_value: Decimal,

    /// Contracts needed for a full hedge, unrounded
    pub required_lots_exact: Decimal,

    /// `required_lots_exact` rounded up
    pub required_lots_ceil: u64,
}

/// Index position relative to its moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendSignal {
    /// Index strictly above its moving average
    Bullish,
    /// Index at or below its moving average
    Bearish,
}

impl TrendSignal {
    /// Classify an index level against its moving average. Equality is bearish.
    pub fn classify(index_price: Decimal, moving_average_price: Decimal) -> Self {
        if index_price > moving_average_price {
            TrendSignal::Bullish
        } else {
            TrendSignal::Bearish
        }
    }
}

impl fmt::Display for TrendSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendSignal::Bullish => write!(f, "BULLISH (index above moving average)"),
            TrendSignal::Bearish => write!(f, "BEARISH (index at or below moving average)"),
        }
    }
}

/// What the operator should do with the futures hedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HedgeAction {
    /// Stay long, no hedge needed
    Maintain,
    /// Open a short futures hedge
    Open,
    /// Buy back the short futures hedge
    Close,
    /// Keep the existing short futures hedge
    HoldHedge,
}

impl HedgeAction {
    /// Verb used when reporting the lot count; `None` when no contracts are involved.
    pub fn lot_verb(&self) -> Option<&'static str> {
        match self {
            HedgeAction::Close => Some("close"),
            HedgeAction::Open => Some("open"),
            HedgeAction::HoldHedge => Some("hold"),
            HedgeAction::Maintain => None,
        }
    }
}

impl fmt::Display for HedgeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HedgeAction::Maintain => write!(f, "Maintain long position (no hedge needed)"),
            HedgeAction::Open => write!(f, "Open short futures hedge now"),
            HedgeAction::Close => write!(f, "Close short futures hedge (unwind)"),
            HedgeAction::HoldHedge => write!(f, "Hold hedge (keep short futures)"),
        }
    }
}

/// Resolver output for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub trend_signal: TrendSignal,
    pub action: HedgeAction,
    /// Contracts to trade (or hold); zero when no hedge is warranted
    pub suggested_lots: u64,
}
