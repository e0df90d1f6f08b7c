//! Exposure and hedge sizing: ETF holding to leveraged exposure to futures contracts.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::{ContractSpec, Position, SizingResult};
use super::{HedgeConfig, HedgeError};

/// Shares in one ETF lot.
pub const SHARES_PER_LOT: u32 = 1000;

/// Size the futures hedge for an ETF holding.
///
/// # Arguments
/// * `holding_lots` - ETF lots held (>= 1)
/// * `unit_price` - ETF price per share (> 0)
/// * `leverage_ratio` - leverage embedded in the ETF (> 0)
/// * `index_price` - current index level; zero yields `DivisionInvalid`
/// * `point_value` - currency value of one index point per contract
///
/// # Returns
/// Notional, exposure, contract value, and exact and rounded-up contract counts.
pub fn compute_sizing(
    holding_lots: u32,
    unit_price: Decimal,
    leverage_ratio: Decimal,
    index_price: Decimal,
    point_value: Decimal,
) -> Result<SizingResult, HedgeError> {
    compute_sizing_with_lot_size(
        holding_lots,
        SHARES_PER_LOT,
        unit_price,
        leverage_ratio,
        index_price,
        point_value,
    )
}

/// Same as [`compute_sizing`] with an explicit lot size.
pub fn compute_sizing_with_lot_size(
    holding_lots: u32,
    shares_per_lot: u32,
    unit_price: Decimal,
    leverage_ratio: Decimal,
    index_price: Decimal,
    point_value: Decimal,
) -> Result<SizingResult, HedgeError> {
    if holding_lots == 0 {
        return Err(HedgeError::InvalidInput(
            "holding lots must be at least 1".to_string(),
        ));
    }
    if shares_per_lot == 0 {
        return Err(HedgeError::InvalidInput(
            "shares per lot must be at least 1".to_string(),
        ));
    }
    if unit_price <= Decimal::ZERO {
        return Err(HedgeError::InvalidInput(format!(
            "unit price must be positive, got {}",
            unit_price
        )));
    }
    if leverage_ratio <= Decimal::ZERO {
        return Err(HedgeError::InvalidInput(format!(
            "leverage ratio must be positive, got {}",
            leverage_ratio
        )));
    }
    if index_price < Decimal::ZERO {
        return Err(HedgeError::InvalidInput(format!(
            "index price must be positive, got {}",
            index_price
        )));
    }
    if point_value < Decimal::ZERO {
        return Err(HedgeError::InvalidInput(format!(
            "point value must be positive, got {}",
            point_value
        )));
    }

    let shares = Decimal::from(holding_lots) * Decimal::from(shares_per_lot);
    let notional_value_1x = checked(shares.checked_mul(unit_price), "notional value")?;
    let effective_exposure = checked(
        notional_value_1x.checked_mul(leverage_ratio),
        "effective exposure",
    )?;
    let contract_value = checked(index_price.checked_mul(point_value), "contract value")?;

    if contract_value.is_zero() {
        return Err(HedgeError::DivisionInvalid { index_price });
    }

    let required_lots_exact = checked(
        effective_exposure.checked_div(contract_value),
        "required lots",
    )?;
    let required_lots_ceil = required_lots_exact.ceil().to_u64().ok_or_else(|| {
        HedgeError::InvalidInput(format!(
            "required lots {} exceed the representable range",
            required_lots_exact
        ))
    })?;

    Ok(SizingResult {
        notional_value_1x,
        effective_exposure,
        contract_value,
        required_lots_exact,
        required_lots_ceil,
    })
}

fn checked(value: Option<Decimal>, what: &str) -> Result<Decimal, HedgeError> {
    value.ok_or_else(|| HedgeError::InvalidInput(format!("{} overflows", what)))
}

/// Sizing engine bound to a hedge configuration.
#[derive(Debug, Clone)]
pub struct HedgeSizer {
    leverage_ratio: Decimal,
    shares_per_lot: u32,
    contract: ContractSpec,
}

impl HedgeSizer {
    pub fn new(config: &HedgeConfig) -> Self {
        Self {
            leverage_ratio: config.leverage_ratio,
            shares_per_lot: config.shares_per_lot,
            contract: config.contract,
        }
    }

    /// Size the hedge for a position at the given index level.
    pub fn size(&self, position: &Position, index_price: Decimal) -> Result<SizingResult, HedgeError> {
        compute_sizing_with_lot_size(
            position.holding_lots,
            self.shares_per_lot,
            position.unit_price,
            self.leverage_ratio,
            index_price,
            self.contract.point_value,
        )
    }
}
