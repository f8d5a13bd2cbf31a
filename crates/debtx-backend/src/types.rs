//! Wire types for the backend REST service
//!
//! Field names follow the backend's camelCase JSON. Integers that can exceed
//! 2^53 (nonces, timestamps, fixed-point values, raw balances) travel as
//! decimal strings; numbers are also accepted on input.

use alloy::primitives::{Address, B256, U256};
use debtx_core::{OrderKind, OrderStatus};
use serde::{Deserialize, Serialize};

/// `{success, data?, error?, timestamp}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `data` of the token list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenList<T> {
    pub tokens: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPrice {
    #[serde(default)]
    pub id: Option<String>,
    pub symbol: String,
    pub decimals: u8,
    #[serde(rename = "priceUSD", with = "lenient_f64")]
    pub price_usd: f64,
    #[serde(default)]
    pub last_updated_at: Option<String>,
}

/// Liquidation parameters as decimal fractions (0.85, not 8500)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenThreshold {
    #[serde(default)]
    pub id: Option<String>,
    pub symbol: String,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(with = "lenient_f64")]
    pub liquidation_threshold: f64,
    #[serde(with = "lenient_f64")]
    pub liquidation_bonus: f64,
}

/// Filters and paging for `GET /api/orders`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub seller: Option<Address>,
    pub debt_address: Option<Address>,
    pub status: Option<OrderStatus>,
    pub order_type: Option<OrderKind>,
    pub chain_id: Option<u64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderQuery {
    pub fn active() -> Self {
        Self {
            status: Some(OrderStatus::Active),
            ..Self::default()
        }
    }

    /// Query string pairs, unset filters omitted
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(seller) = self.seller {
            pairs.push(("seller", seller.to_string()));
        }
        if let Some(debt) = self.debt_address {
            pairs.push(("debtAddress", debt.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(kind) = self.order_type {
            pairs.push(("orderType", kind.as_str().to_string()));
        }
        if let Some(chain_id) = self.chain_id {
            pairs.push(("chainId", chain_id.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTitleDto {
    pub debt: Address,
    #[serde(with = "u256_string")]
    pub debt_nonce: U256,
    #[serde(with = "u256_string")]
    pub start_time: U256,
    #[serde(with = "u256_string")]
    pub end_time: U256,
    #[serde(rename = "triggerHF", with = "u256_string")]
    pub trigger_hf: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSellOrderDto {
    pub title: OrderTitleDto,
    pub token: Address,
    #[serde(with = "u256_string")]
    pub bonus: U256,
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSellOrderDto {
    pub title: OrderTitleDto,
    #[serde(with = "u256_string")]
    pub interest_rate_mode: U256,
    pub collateral_out: Vec<Address>,
    #[serde(with = "u256_string_vec")]
    pub percents: Vec<U256>,
    pub repay_token: Address,
    #[serde(with = "u256_string")]
    pub repay_amount: U256,
    #[serde(with = "u256_string")]
    pub bonus: U256,
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

/// Stored order as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: String,
    pub order_type: OrderKind,
    pub status: OrderStatus,
    pub seller: Address,
    #[serde(default)]
    pub buyer: Option<Address>,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub full_sell_order: Option<FullSellOrderDto>,
    #[serde(default)]
    pub partial_sell_order: Option<PartialSellOrderDto>,
    /// Health factor recorded at listing time. Not authoritative.
    #[serde(default, with = "lenient_f64_opt")]
    pub health_factor: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl OrderRecord {
    /// Debt position the order sells
    pub fn debt_address(&self) -> Option<Address> {
        match self.order_type {
            OrderKind::Full => self.full_sell_order.as_ref().map(|o| o.title.debt),
            OrderKind::Partial => self.partial_sell_order.as_ref().map(|o| o.title.debt),
        }
    }
}

/// `data` of `GET /api/orders`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    pub orders: Vec<OrderRecord>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Body of `POST /api/orders`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order_type: OrderKind,
    pub chain_id: u64,
    pub seller: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_sell_order: Option<FullSellOrderDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_sell_order: Option<PartialSellOrderDto>,
}

/// Body of `POST /api/orders/:id/cancel`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub seller: Address,
    pub message: String,
    /// 0x-prefixed 65-byte signature
    pub signature: String,
}

/// One collateral or debt line of a position snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionLine {
    pub token: Address,
    pub symbol: String,
    pub decimals: u8,
    /// Raw balance in the token's smallest unit
    #[serde(with = "u256_string")]
    pub balance: U256,
    #[serde(default, rename = "balanceUSD", with = "lenient_f64_opt")]
    pub balance_usd: Option<f64>,
}

/// `GET /api/positions/:debtAddress`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub address: Address,
    pub owner: Address,
    #[serde(with = "u256_string")]
    pub nonce: U256,
    #[serde(default)]
    pub collaterals: Vec<PositionLine>,
    #[serde(default)]
    pub debts: Vec<PositionLine>,
    /// Backend-cached value, display only
    #[serde(default, with = "lenient_f64_opt")]
    pub health_factor: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

fn parse_u256(raw: &str) -> Result<U256, String> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(raw, 10),
    };
    parsed.map_err(|e| format!("invalid integer '{}': {}", raw, e))
}

mod u256_string {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::String(s) => s,
        };
        parse_u256(&raw).map_err(serde::de::Error::custom)
    }
}

mod u256_string_vec {
    use super::*;
    use serde::ser::SerializeSeq;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            seq.serialize_element(&v.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<U256>, D::Error> {
        Vec::<NumberOrString>::deserialize(deserializer)?
            .into_iter()
            .map(|v| {
                let raw = match v {
                    NumberOrString::Number(n) => n.to_string(),
                    NumberOrString::String(s) => s,
                };
                parse_u256(&raw).map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

mod lenient_f64 {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => n
                .as_f64()
                .ok_or_else(|| serde::de::Error::custom("number out of range")),
            NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        }
    }
}

mod lenient_f64_opt {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        match Option::<NumberOrString>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumberOrString::Number(n)) => Ok(n.as_f64()),
            Some(NumberOrString::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
