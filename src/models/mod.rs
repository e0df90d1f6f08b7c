//! Data models for the holding, market levels, and hedge recommendations.

mod market;
mod position;
mod recommendation;

pub use market::{ContractSpec, MarketLevel};
pub use position::{HedgeState, Position};
pub use recommendation::{HedgeAction, Recommendation, SizingResult, TrendSignal};
