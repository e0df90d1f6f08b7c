//! Calculator session: the inputs the operator is working with and their provenance.
//!
//! Handles:
//! - Seeding inputs with placeholder defaults until live data arrives
//! - Refreshing the index, moving average, and ETF price from a `MarketData` source
//! - Keeping the last known value (flagged unverified) when a refresh fails
//! - Running the sizing engine and the action resolver on the current inputs

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use tracing::{info, warn};

use crate::api::{MarketData, MarketDataError};
use crate::hedging::{resolve_action, state_after, HedgeConfig, HedgeError, HedgeSizer};
use crate::models::{HedgeState, MarketLevel, Position, Recommendation, SizingResult};

/// Where an input value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Placeholder default, nothing loaded yet
    Default,
    /// Fetched from market data during this session
    Live,
    /// Last known value kept after a failed refresh
    Stale,
    /// Typed in by the operator
    Manual,
}

/// Input value tagged with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quoted {
    pub value: Decimal,
    pub source: Provenance,
}

impl Provenance {
    pub fn is_verified(&self) -> bool {
        matches!(self, Provenance::Live | Provenance::Manual)
    }

    fn marker(&self) -> &'static str {
        match self {
            Provenance::Default => " (default)",
            Provenance::Stale => " (stale)",
            Provenance::Live | Provenance::Manual => "",
        }
    }
}

impl Quoted {
    pub fn default_value(value: Decimal) -> Self {
        Self {
            value,
            source: Provenance::Default,
        }
    }

    pub fn live(value: Decimal) -> Self {
        Self {
            value,
            source: Provenance::Live,
        }
    }

    pub fn manual(value: Decimal) -> Self {
        Self {
            value,
            source: Provenance::Manual,
        }
    }

    /// Keep the value but mark it unverified after a failed refresh.
    fn mark_stale(&mut self) {
        if self.source != Provenance::Default {
            self.source = Provenance::Stale;
        }
    }
}

/// Explicit state of one calculator session.
#[derive(Debug, Clone)]
pub struct SessionState {
    config: HedgeConfig,
    pub holding_lots: u32,
    pub unit_price: Quoted,
    pub index_price: Quoted,
    pub moving_average: Quoted,
    pub hedge_state: HedgeState,
    pub ma_days: u32,
}

impl SessionState {
    /// Fresh session seeded with placeholder defaults.
    pub fn new(config: HedgeConfig) -> Self {
        Self {
            holding_lots: 7,
            unit_price: Quoted::default_value(config.fallback_unit_price),
            index_price: Quoted::default_value(config.fallback_index_price),
            moving_average: Quoted::default_value(config.fallback_moving_average),
            hedge_state: HedgeState::Unhedged,
            ma_days: config.ma_days,
            config,
        }
    }

    pub fn config(&self) -> &HedgeConfig {
        &self.config
    }

    /// True while the moving average is still the placeholder.
    pub fn is_default_moving_average(&self) -> bool {
        self.moving_average.source == Provenance::Default
    }

    /// Change the moving-average window. The current MA no longer matches it.
    pub fn set_ma_days(&mut self, ma_days: u32) {
        if ma_days != self.ma_days {
            self.ma_days = ma_days;
            self.moving_average.mark_stale();
        }
    }

    /// Fetch the latest index close and its moving average for `ma_days`.
    pub async fn refresh_index<S>(&mut self, source: &S) -> Result<(), MarketDataError>
    where
        S: MarketData + ?Sized,
    {
        let result = source
            .fetch_latest_price_and_moving_average(&self.config.index_ticker, self.ma_days)
            .await;
        self.apply_index_result(result)
    }

    /// Fetch the latest ETF close.
    pub async fn refresh_unit_price<S>(&mut self, source: &S) -> Result<(), MarketDataError>
    where
        S: MarketData + ?Sized,
    {
        let result = source.fetch_latest_price(&self.config.etf_ticker).await;
        self.apply_price_result(result)
    }

    /// Refresh index and ETF price concurrently. Each failure is handled independently.
    pub async fn refresh_all<S>(&mut self, source: &S) -> Vec<MarketDataError>
    where
        S: MarketData + ?Sized,
    {
        let (levels, price) = futures::join!(
            source.fetch_latest_price_and_moving_average(&self.config.index_ticker, self.ma_days),
            source.fetch_latest_price(&self.config.etf_ticker),
        );

        [self.apply_index_result(levels), self.apply_price_result(price)]
            .into_iter()
            .filter_map(Result::err)
            .collect()
    }

    fn apply_index_result(
        &mut self,
        result: Result<(Decimal, Decimal), MarketDataError>,
    ) -> Result<(), MarketDataError> {
        match result {
            Ok((index, ma)) => {
                self.index_price = Quoted::live(index);
                self.moving_average = Quoted::live(ma);
                info!(
                    ticker = %self.config.index_ticker,
                    index = %index,
                    ma = %ma,
                    ma_days = self.ma_days,
                    "Index and moving average updated"
                );
                Ok(())
            }
            Err(e) => {
                self.index_price.mark_stale();
                self.moving_average.mark_stale();
                warn!(
                    ticker = %self.config.index_ticker,
                    error = %e,
                    "Index data unavailable, keeping previous values"
                );
                Err(e)
            }
        }
    }

    fn apply_price_result(&mut self, result: Result<Decimal, MarketDataError>) -> Result<(), MarketDataError> {
        match result {
            Ok(price) => {
                self.unit_price = Quoted::live(price);
                info!(ticker = %self.config.etf_ticker, price = %price, "ETF price updated");
                Ok(())
            }
            Err(e) => {
                self.unit_price.mark_stale();
                warn!(
                    ticker = %self.config.etf_ticker,
                    error = %e,
                    "ETF price unavailable, keeping previous value"
                );
                Err(e)
            }
        }
    }

    /// Size the hedge and resolve the action for the current inputs.
    pub fn evaluate(&self) -> Result<Evaluation, HedgeError> {
        let position = Position::new(self.holding_lots, self.unit_price.value);
        let market = MarketLevel::new(self.index_price.value, self.moving_average.value, self.ma_days);

        let sizing = HedgeSizer::new(&self.config).size(&position, market.index_price)?;
        let recommendation = resolve_action(
            market.index_price,
            market.moving_average_price,
            self.hedge_state,
            sizing.required_lots_ceil,
        );

        Ok(Evaluation {
            position,
            market,
            hedge_state: self.hedge_state,
            sizing,
            recommendation,
            sources: InputSources {
                unit_price: self.unit_price.source,
                index_price: self.index_price.source,
                moving_average: self.moving_average.source,
            },
        })
    }

    /// Record that the operator acted on a recommendation.
    pub fn apply(&mut self, recommendation: &Recommendation) -> HedgeState {
        self.hedge_state = state_after(recommendation.action, self.hedge_state);
        self.hedge_state
    }
}

/// Result of one evaluation pass.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub position: Position,
    pub market: MarketLevel,
    pub hedge_state: HedgeState,
    pub sizing: SizingResult,
    pub recommendation: Recommendation,
    pub sources: InputSources,
}

/// Provenance of each market input used in an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSources {
    pub unit_price: Provenance,
    pub index_price: Provenance,
    pub moving_average: Provenance,
}

impl Evaluation {
    /// Names of inputs that are placeholders or stale.
    pub fn unverified(&self) -> Vec<&'static str> {
        [
            ("ETF price", self.sources.unit_price),
            ("index", self.sources.index_price),
            ("moving average", self.sources.moving_average),
        ]
        .into_iter()
        .filter(|(_, p)| !p.is_verified())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_verified(&self) -> bool {
        self.unverified().is_empty()
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rec = &self.recommendation;
        let s = &self.sizing;

        writeln!(f, "\n=== Hedge Recommendation ({}-day MA) ===", self.market.period_days)?;
        writeln!(f, "Signal:            {}", rec.trend_signal)?;
        writeln!(f, "Position state:    {}", self.hedge_state)?;
        writeln!(f, "Action:            {}", rec.action)?;

        writeln!(f, "\n--- Inputs ---")?;
        let src = &self.sources;
        writeln!(
            f,
            "Holding:           {} lots @ {}{}",
            self.position.holding_lots,
            fmt_2dp(self.position.unit_price),
            src.unit_price.marker()
        )?;
        writeln!(
            f,
            "Index:             {} pts{}",
            group_thousands(self.market.index_price.round()),
            src.index_price.marker()
        )?;
        writeln!(
            f,
            "Moving average:    {} pts{}",
            group_thousands(self.market.moving_average_price.round()),
            src.moving_average.marker()
        )?;
        let spread = self.market.spread().round();
        let sign = if spread > Decimal::ZERO { "+" } else { "" };
        writeln!(f, "Distance from MA:  {}{} pts", sign, spread)?;

        writeln!(f, "\n--- Sizing ---")?;
        writeln!(f, "Notional (1x):     {}", group_thousands(s.notional_value_1x.round()))?;
        writeln!(f, "Effective exposure: {}", group_thousands(s.effective_exposure.round()))?;
        writeln!(f, "Contract value:    {}", group_thousands(s.contract_value.round()))?;
        writeln!(f, "Exact lots:        {}", fmt_2dp(s.required_lots_exact))?;

        let lots = match rec.action.lot_verb() {
            Some(verb) => format!("{} {} lots", verb, rec.suggested_lots),
            None => "0 lots".to_string(),
        };
        writeln!(f, "Suggested:         {}", lots)?;

        writeln!(
            f,
            "\nFull hedge needs {} contracts; rounded up to {} so the exposure is never under-hedged.",
            fmt_2dp(s.required_lots_exact),
            s.required_lots_ceil
        )?;

        if !self.is_verified() {
            write!(
                f,
                "\nWARNING: unverified inputs (default or stale): {}",
                self.unverified().join(", ")
            )?;
        }

        Ok(())
    }
}

/// Two decimal places, midpoint away from zero. `{:.2}` alone truncates a `Decimal`.
fn fmt_2dp(value: Decimal) -> String {
    format!("{:.2}", value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Format an integral amount with comma separators.
pub fn group_thousands(value: Decimal) -> String {
    let raw = value.trunc().abs().to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < Decimal::ZERO && value.trunc() != Decimal::ZERO {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketData;
    use crate::models::{HedgeAction, TrendSignal};
    use rust_decimal_macros::dec;

    fn session() -> SessionState {
        SessionState::new(HedgeConfig::default())
    }

    #[test]
    fn test_new_session_is_unverified() {
        let state = session();
        assert!(state.is_default_moving_average());

        let eval = state.evaluate().unwrap();
        assert_eq!(eval.unverified(), vec!["ETF price", "index", "moving average"]);
        // Defaults: 19500 > 19000 while unhedged
        assert_eq!(eval.recommendation.action, HedgeAction::Maintain);
        assert_eq!(eval.sizing.required_lots_ceil, 1);
    }

    #[tokio::test]
    async fn test_refresh_uses_live_values() {
        let mock = MockMarketData::new()
            .with_moving_average("^TWII", 13, dec!(19000), dec!(19500))
            .with_price("00631L.TW", dec!(50.0));
        let mut state = session();

        assert!(state.refresh_all(&mock).await.is_empty());
        assert!(!state.is_default_moving_average());

        let eval = state.evaluate().unwrap();
        assert!(eval.is_verified());
        assert_eq!(eval.recommendation.trend_signal, TrendSignal::Bearish);
        assert_eq!(eval.recommendation.action, HedgeAction::Open);
        assert_eq!(eval.recommendation.suggested_lots, eval.sizing.required_lots_ceil);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_known_as_stale() {
        let mock = MockMarketData::new().with_moving_average("^TWII", 13, dec!(21000), dec!(20500));
        let mut state = session();
        state.refresh_index(&mock).await.unwrap();

        // No 20-day data in the mock.
        state.set_ma_days(20);
        assert!(state.refresh_index(&mock).await.is_err());

        assert_eq!(state.index_price.value, dec!(21000));
        assert_eq!(state.index_price.source, Provenance::Stale);
        assert_eq!(state.moving_average.source, Provenance::Stale);
        assert!(state.evaluate().unwrap().unverified().contains(&"index"));
    }

    #[tokio::test]
    async fn test_live_ma_equal_to_placeholder_is_not_default() {
        let mock = MockMarketData::new().with_moving_average("^TWII", 13, dec!(19500), dec!(19000));
        let mut state = session();
        state.refresh_index(&mock).await.unwrap();

        assert_eq!(state.moving_average.value, state.config().fallback_moving_average);
        assert!(!state.is_default_moving_average());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_default_flag() {
        let mut state = session();
        assert!(state.refresh_unit_price(&MockMarketData::new()).await.is_err());
        assert_eq!(state.unit_price.source, Provenance::Default);
        assert_eq!(state.unit_price.value, dec!(50.0));
    }

    #[test]
    fn test_manual_inputs_are_verified() {
        let mut state = session();
        state.unit_price = Quoted::manual(dec!(50.0));
        state.index_price = Quoted::manual(dec!(19500));
        state.moving_average = Quoted::manual(dec!(19000));
        state.hedge_state = HedgeState::Hedged;

        let eval = state.evaluate().unwrap();
        assert!(eval.is_verified());
        assert_eq!(eval.recommendation.action, HedgeAction::Close);
        assert_eq!(eval.recommendation.suggested_lots, 1);
    }

    #[test]
    fn test_zero_index_surfaces_division_error() {
        let mut state = session();
        state.index_price = Quoted::manual(Decimal::ZERO);
        assert!(matches!(state.evaluate(), Err(HedgeError::DivisionInvalid { .. })));
    }

    #[test]
    fn test_apply_moves_hedge_state() {
        let mut state = session();
        state.index_price = Quoted::manual(dec!(18000));

        let eval = state.evaluate().unwrap();
        assert_eq!(state.apply(&eval.recommendation), HedgeState::Hedged);

        state.index_price = Quoted::manual(dec!(20000));
        let eval = state.evaluate().unwrap();
        assert_eq!(eval.recommendation.action, HedgeAction::Close);
        assert_eq!(state.apply(&eval.recommendation), HedgeState::Unhedged);
    }

    #[test]
    fn test_report_mentions_action_and_warning() {
        let report = session().evaluate().unwrap().to_string();
        assert!(report.contains("Maintain long position"));
        assert!(report.contains("700,000"));
        assert!(report.contains("975,000"));
        assert!(report.contains("0.72"));
        assert!(report.contains("19,000 pts (default)"));
        assert!(report.contains("WARNING"));
    }

    #[test]
    fn test_exact_lots_are_rounded_not_truncated() {
        let mut eval = session().evaluate().unwrap();
        eval.sizing.required_lots_exact = dec!(1.999);
        eval.sizing.required_lots_ceil = 2;

        let report = eval.to_string();
        assert!(report.contains("Exact lots:        2.00"));
        assert!(report.contains("Full hedge needs 2.00 contracts"));
        assert_eq!(fmt_2dp(dec!(0.71794871)), "0.72");
        assert_eq!(fmt_2dp(dec!(48.345)), "48.35");
    }

    #[test]
    fn test_report_lot_lines_per_action() {
        let mut state = session();
        state.moving_average = Quoted::manual(dec!(19000));

        // 18000 pts: 700,000 / 900,000 = 0.78 -> 1 lot
        state.index_price = Quoted::manual(dec!(18000));
        let report = state.evaluate().unwrap().to_string();
        assert!(report.contains("Suggested:         open 1 lots"));

        state.hedge_state = HedgeState::Hedged;
        let report = state.evaluate().unwrap().to_string();
        assert!(report.contains("Suggested:         hold 1 lots"));

        state.index_price = Quoted::manual(dec!(20000));
        let report = state.evaluate().unwrap().to_string();
        assert!(report.contains("Suggested:         close 1 lots"));

        state.hedge_state = HedgeState::Unhedged;
        let report = state.evaluate().unwrap().to_string();
        assert!(report.contains("Suggested:         0 lots"));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(dec!(975000)), "975,000");
        assert_eq!(group_thousands(dec!(1234567.89)), "1,234,567");
        assert_eq!(group_thousands(dec!(999)), "999");
        assert_eq!(group_thousands(dec!(-19500)), "-19,500");
    }
}
