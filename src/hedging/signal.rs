//! Moving-average trend signal and the hedge action decision table.
//!
//! The resolver only recommends. Moving between `Unhedged` and `Hedged` is done
//! by the operator, who declares the new state on the next evaluation.

use rust_decimal::Decimal;

use crate::models::{HedgeAction, HedgeState, Recommendation, TrendSignal};

/// Pick the hedge action for the current trend and declared hedge state.
///
/// | Trend   | Unhedged          | Hedged                |
/// |---------|-------------------|-----------------------|
/// | Bullish | Maintain, 0 lots  | Close, required lots  |
/// | Bearish | Open, required    | HoldHedge, required   |
pub fn resolve_action(
    index_price: Decimal,
    moving_average_price: Decimal,
    hedge_state: HedgeState,
    required_lots_ceil: u64,
) -> Recommendation {
    let trend_signal = TrendSignal::classify(index_price, moving_average_price);

    let (action, suggested_lots) = match (trend_signal, hedge_state) {
        (TrendSignal::Bullish, HedgeState::Unhedged) => (HedgeAction::Maintain, 0),
        (TrendSignal::Bullish, HedgeState::Hedged) => (HedgeAction::Close, required_lots_ceil),
        (TrendSignal::Bearish, HedgeState::Unhedged) => (HedgeAction::Open, required_lots_ceil),
        (TrendSignal::Bearish, HedgeState::Hedged) => (HedgeAction::HoldHedge, required_lots_ceil),
    };

    Recommendation {
        trend_signal,
        action,
        suggested_lots,
    }
}

/// State the operator ends up in after acting on a recommendation.
pub fn state_after(action: HedgeAction, current: HedgeState) -> HedgeState {
    match action {
        HedgeAction::Open | HedgeAction::HoldHedge => HedgeState::Hedged,
        HedgeAction::Close => HedgeState::Unhedged,
        HedgeAction::Maintain => current,
    }
}
