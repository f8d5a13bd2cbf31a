//! Debt Trade State Types
//!
//! Position line items, price data, health reports and sale quotes.

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use debtx_backend::{OrderRecord, PositionLine, TokenPrice, TokenThreshold};
use debtx_core::fixed_point::{from_fixed_point, to_fixed_point};
use debtx_core::constants::HEALTH_FACTOR_DECIMALS;
use serde::{Deserialize, Serialize};

use crate::constants::health::NO_DEBT_HEALTH_FACTOR;
use crate::lifecycle::Executability;

/// Health factor band for UI color coding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Safe,     // >= 2.0
    Warning,  // >= 1.5
    Danger,   // >= 1.1
    Critical, // < 1.1
}

impl HealthStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Critical => "critical",
        }
    }
}

/// One collateral or debt balance of a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionAsset {
    pub symbol: String,
    pub token: Option<Address>,
    /// Raw balance in the token's smallest unit
    pub balance: U256,
    pub decimals: u8,
}

impl PositionAsset {
    pub fn new(symbol: impl Into<String>, balance: U256, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            token: None,
            balance,
            decimals,
        }
    }

    /// Balance in whole tokens
    pub fn amount(&self) -> f64 {
        from_fixed_point(self.balance, self.decimals)
    }
}

impl From<&PositionLine> for PositionAsset {
    fn from(line: &PositionLine) -> Self {
        Self {
            symbol: line.symbol.clone(),
            token: Some(line.token),
            balance: line.balance,
            decimals: line.decimals,
        }
    }
}

/// USD prices and liquidation thresholds keyed by upper-cased symbol
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceBook {
    prices: HashMap<String, f64>,
    thresholds: HashMap<String, f64>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_backend(prices: &[TokenPrice], thresholds: &[TokenThreshold]) -> Self {
        let mut book = Self::new();
        for p in prices {
            book.set_price(&p.symbol, p.price_usd);
        }
        for t in thresholds {
            book.set_threshold(&t.symbol, t.liquidation_threshold);
        }
        book
    }

    pub fn set_price(&mut self, symbol: &str, price_usd: f64) {
        if price_usd.is_finite() && price_usd >= 0.0 {
            self.prices.insert(symbol.to_uppercase(), price_usd);
        }
    }

    /// `threshold` is a fraction, e.g. 0.85
    pub fn set_threshold(&mut self, symbol: &str, threshold: f64) {
        if threshold.is_finite() && threshold >= 0.0 {
            self.thresholds.insert(symbol.to_uppercase(), threshold);
        }
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(&symbol.to_uppercase()).copied()
    }

    pub fn threshold(&self, symbol: &str) -> Option<f64> {
        self.thresholds.get(&symbol.to_uppercase()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Output of the health factor calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub health_factor: f64,
    pub total_collateral_usd: f64,
    pub total_debt_usd: f64,
    pub weighted_avg_threshold: f64,
    /// Symbols valued at zero because no price was available
    pub missing_prices: Vec<String>,
    /// Symbols weighted with the default threshold
    pub missing_thresholds: Vec<String>,
}

impl HealthReport {
    pub fn price_unavailable(&self) -> bool {
        !self.missing_prices.is_empty()
    }

    pub fn has_debt(&self) -> bool {
        self.health_factor < NO_DEBT_HEALTH_FACTOR
    }

    /// 18-decimal fixed point, for comparison against an order trigger
    pub fn health_factor_wad(&self) -> U256 {
        to_fixed_point(self.health_factor, HEALTH_FACTOR_DECIMALS, HEALTH_FACTOR_DECIMALS)
            .unwrap_or(U256::MAX)
    }
}

/// Health report plus its presentation band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionHealth {
    pub debt_address: Address,
    #[serde(flatten)]
    pub report: HealthReport,
    pub status: HealthStatus,
    pub liquidatable: bool,
}

/// Amounts for buying a position outright. Base amounts are in the pool's
/// base currency (USD, 8 decimals).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullSaleQuote {
    pub net_equity_base: U256,
    /// What the buyer pays the seller
    pub payment_base: U256,
    /// `total_debt_base * bonus / 10000`
    pub buyer_profit_base: U256,
}

/// Collateral withdrawn to the buyer of a partial order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollateralShare {
    pub token: Address,
    pub percent_bps: u64,
    pub value_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialSaleQuote {
    pub repay_value_usd: f64,
    pub bonus_value_usd: f64,
    /// Repay value plus bonus, split over `collateral_out`
    pub collateral_out_value_usd: f64,
    pub shares: Vec<CollateralShare>,
    pub price_unavailable: bool,
}

/// An order as shown in the market view, with live health data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOrder {
    #[serde(flatten)]
    pub record: OrderRecord,
    /// Recomputed from current position data; `None` if that could not be fetched
    pub health: Option<HealthReport>,
    pub health_status: Option<HealthStatus>,
    pub executability: Option<Executability>,
    pub executable: bool,
    pub reason: String,
}

/// Market view response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketResponse {
    pub orders: Vec<MarketOrder>,
    pub total: Option<u64>,
    pub price_unavailable: bool,
}
