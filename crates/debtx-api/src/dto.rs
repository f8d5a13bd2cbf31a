//! Data Transfer Objects for API requests and responses

use alloy::primitives::{Address, B256};
use debt_trade::{OrderDomain, OrderDraft};
use debtx_core::{Error, OrderKind};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend_online: bool,
    pub chain_id: u64,
    pub wallet: Option<Address>,
}

/// `POST /orders/hash` body: a draft plus an optional domain override
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHashRequest {
    pub draft: OrderDraft,
    #[serde(default)]
    pub domain: Option<OrderDomain>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHashResponse {
    pub order_type: OrderKind,
    pub domain: OrderDomain,
    pub title_hash: B256,
    pub struct_hash: B256,
    /// What the wallet signs under the domain's scheme
    pub digest: B256,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

impl From<&Error> for ApiError {
    fn from(e: &Error) -> Self {
        Self::new(e.error_code(), e.to_string())
    }
}
