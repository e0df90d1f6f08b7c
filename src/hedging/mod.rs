//! Hedge logic: exposure sizing, moving-average signal, action resolution.

mod config;
mod error;
mod signal;
mod sizing;

pub use config::{ConfigError, HedgeConfig, DEFAULT_MARKET_DATA_URL};
pub use error::HedgeError;
pub use signal::{resolve_action, state_after};
pub use sizing::{compute_sizing, compute_sizing_with_lot_size, HedgeSizer, SHARES_PER_LOT};
