//! Debt Trade Calculator
//!
//! Pure math for health factors, status bands and sale quotes.
//! No I/O - just calculations.

use alloy::primitives::{Address, U256};
use debtx_core::constants::BASIS_POINTS;
use debtx_core::fixed_point::{apply_basis_points, basis_points_to_fraction, from_fixed_point, pow10};
use debtx_core::{HealthBands, OrderError};
use evm_tx::AccountData;

use crate::constants::health::{DEFAULT_LIQUIDATION_THRESHOLD_BPS, NO_DEBT_HEALTH_FACTOR};
use crate::state::{
    CollateralShare, FullSaleQuote, HealthReport, HealthStatus, PartialSaleQuote, PositionAsset,
};

/// Compute the aggregate health factor of a position.
///
/// `price_of` returns a USD price and `threshold_of` a liquidation threshold
/// fraction for a symbol. A symbol without a price is valued at zero and
/// reported in `missing_prices`; a collateral without a threshold is weighted
/// with the 85% default and reported in `missing_thresholds`.
pub fn compute_health_factor<P, T>(
    collaterals: &[PositionAsset],
    debts: &[PositionAsset],
    price_of: P,
    threshold_of: T,
) -> HealthReport
where
    P: Fn(&str) -> Option<f64>,
    T: Fn(&str) -> Option<f64>,
{
    let mut missing_prices: Vec<String> = Vec::new();
    let mut missing_thresholds: Vec<String> = Vec::new();

    let mut value_of = |asset: &PositionAsset| match price_of(&asset.symbol) {
        Some(price) => asset.amount() * price,
        None => {
            if !missing_prices.contains(&asset.symbol) {
                missing_prices.push(asset.symbol.clone());
            }
            0.0
        }
    };

    let mut total_collateral_usd = 0.0;
    let mut weighted_collateral_usd = 0.0;
    for collateral in collaterals {
        let value = value_of(collateral);
        let threshold = match threshold_of(&collateral.symbol) {
            Some(t) => t,
            None => {
                if !missing_thresholds.contains(&collateral.symbol) {
                    missing_thresholds.push(collateral.symbol.clone());
                }
                basis_points_to_fraction(DEFAULT_LIQUIDATION_THRESHOLD_BPS)
            }
        };
        total_collateral_usd += value;
        weighted_collateral_usd += value * threshold;
    }

    let total_debt_usd: f64 = debts.iter().map(&mut value_of).sum();

    let health_factor = if total_debt_usd > 0.0 {
        weighted_collateral_usd / total_debt_usd
    } else {
        NO_DEBT_HEALTH_FACTOR
    };

    let weighted_avg_threshold = if total_collateral_usd > 0.0 {
        weighted_collateral_usd / total_collateral_usd
    } else {
        0.0
    };

    HealthReport {
        health_factor,
        total_collateral_usd,
        total_debt_usd,
        weighted_avg_threshold,
        missing_prices,
        missing_thresholds,
    }
}

/// Determine health status from health factor
pub fn health_status(health_factor: f64, bands: &HealthBands) -> HealthStatus {
    if health_factor >= bands.safe {
        HealthStatus::Safe
    } else if health_factor >= bands.warning {
        HealthStatus::Warning
    } else if health_factor >= bands.danger {
        HealthStatus::Danger
    } else {
        HealthStatus::Critical
    }
}

/// Below the liquidation band the pool can liquidate the position
pub fn is_liquidatable(health_factor: f64, bands: &HealthBands) -> bool {
    health_factor < bands.liquidation
}

/// Payment and profit for buying a whole position.
///
/// The seller receives net equity less the bonus share; the buyer's profit
/// is the bonus share of total debt.
pub fn quote_full_sale(account: &AccountData, bonus_bps: u64) -> FullSaleQuote {
    let bonus_bps = bonus_bps.min(BASIS_POINTS);
    let net_equity_base = account.net_equity_base();
    FullSaleQuote {
        net_equity_base,
        payment_base: apply_basis_points(net_equity_base, BASIS_POINTS - bonus_bps),
        buyer_profit_base: apply_basis_points(account.total_debt_base, bonus_bps),
    }
}

/// Convert a base-currency amount into token units: `base * 10^decimals / price`.
/// Both `base` and `price_base` use the oracle's base precision.
pub fn base_to_token_amount(
    base: U256,
    price_base: U256,
    decimals: u8,
    symbol: &str,
) -> Result<U256, OrderError> {
    if price_base.is_zero() {
        return Err(OrderError::PriceUnavailable {
            symbol: symbol.to_string(),
        });
    }
    Ok(base.saturating_mul(pow10(decimals)) / price_base)
}

/// Value of a partial order to the buyer, priced from the market view.
pub fn quote_partial_sale<P>(
    repay_amount: U256,
    repay_decimals: u8,
    repay_symbol: &str,
    bonus_bps: u64,
    collateral_out: &[(Address, u64)],
    price_of: P,
) -> PartialSaleQuote
where
    P: Fn(&str) -> Option<f64>,
{
    let price = price_of(repay_symbol);
    let repay_value_usd = from_fixed_point(repay_amount, repay_decimals) * price.unwrap_or(0.0);
    let bonus_value_usd = repay_value_usd * basis_points_to_fraction(bonus_bps);
    let collateral_out_value_usd = repay_value_usd + bonus_value_usd;

    let shares = collateral_out
        .iter()
        .map(|(token, percent_bps)| CollateralShare {
            token: *token,
            percent_bps: *percent_bps,
            value_usd: collateral_out_value_usd * basis_points_to_fraction(*percent_bps),
        })
        .collect();

    PartialSaleQuote {
        repay_value_usd,
        bonus_value_usd,
        collateral_out_value_usd,
        shares,
        price_unavailable: price.is_none(),
    }
}
