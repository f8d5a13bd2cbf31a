//! Core type definitions for debtx

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a listed order as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Active,
    Executed,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Executed => "EXECUTED",
            Self::Cancelled => "CANCELLED",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Whether an externally observed move from `self` to `next` is legal.
    /// Only ACTIVE can move, and only into one of the terminal states.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (a, b) if *a == b => true,
            (Self::Active, _) => true,
            _ => false,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order variant tag used on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Full,
    Partial,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Step of a multi-transaction flow, used to say which phase failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStage {
    Signing,
    Approval,
    Execution,
    ReceiptWait,
    Sync,
    Cancellation,
}

impl TxStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signing => "signing",
            Self::Approval => "approval",
            Self::Execution => "execution",
            Self::ReceiptWait => "receipt wait",
            Self::Sync => "sync",
            Self::Cancellation => "cancellation",
        }
    }
}

impl fmt::Display for TxStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unix timestamp in seconds
pub type UnixSeconds = u64;

/// Constants
pub mod constants {
    use alloy::primitives::U256;

    /// 10000 basis points = 100%
    pub const BASIS_POINTS: u64 = 10_000;

    /// Health factor fixed-point precision (1.0 == 10^18)
    pub const HEALTH_FACTOR_DECIMALS: u8 = 18;

    /// 10^18
    pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

    /// Pool base currency precision (USD, 8 decimals)
    pub const BASE_CURRENCY_DECIMALS: u8 = 8;

    /// Sepolia testnet chain id
    pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;
}
