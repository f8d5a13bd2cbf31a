//! Configuration types for debtx

use std::path::Path;
use std::time::Duration;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::constants::SEPOLIA_CHAIN_ID;
use crate::Error;

/// Backend REST service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend URL (e.g., "http://127.0.0.1:3001")
    pub url: String,

    /// Timeout for every backend call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3001".to_string(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// How an order struct hash is turned into the message the wallet signs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureScheme {
    /// Sign the 32-byte struct hash directly, no prefix
    #[default]
    RawHash,
    /// Sign `"\x19Ethereum Signed Message:\n32" || hash`
    EthSignedMessage,
}

/// Chain and contract configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,

    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Debt router (order verifier and multicall target)
    pub router_address: Address,

    /// Lending pool
    pub pool_address: Address,

    /// Pool price oracle (base currency, 8 decimals)
    pub oracle_address: Address,

    #[serde(default)]
    pub signature_scheme: SignatureScheme,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            router_address: Address::ZERO,
            pool_address: Address::ZERO,
            oracle_address: Address::ZERO,
            signature_scheme: SignatureScheme::default(),
        }
    }
}

/// Timeouts, polling bounds and amount buffers for transaction flows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Timeout for a single RPC read
    pub rpc_timeout_secs: u64,
    /// How long to wait for a transaction receipt
    pub receipt_timeout_secs: u64,
    /// Delay between receipt polls
    pub receipt_poll_interval_ms: u64,
    /// Allowance confirmation polls after an approval is mined
    pub approval_poll_attempts: u32,
    pub approval_poll_interval_secs: u64,
    /// Countdown shown while the backend indexer catches up
    pub sync_countdown_secs: u64,
    /// Extra allowance / repay amount on top of the freshly read value
    pub allowance_buffer_bps: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: 10,
            receipt_timeout_secs: 60,
            receipt_poll_interval_ms: 2_000,
            approval_poll_attempts: 20,
            approval_poll_interval_secs: 3,
            sync_countdown_secs: 10,
            allowance_buffer_bps: 50,
        }
    }
}

impl ExecutionConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn approval_poll_interval(&self) -> Duration {
        Duration::from_secs(self.approval_poll_interval_secs)
    }
}

/// Health factor status band lower bounds (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthBands {
    pub safe: f64,
    pub warning: f64,
    pub danger: f64,
    /// Below this the position can be liquidated on the pool
    pub liquidation: f64,
}

impl Default for HealthBands {
    fn default() -> Self {
        Self {
            safe: 2.0,
            warning: 1.5,
            danger: 1.1,
            liquidation: 1.0,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub chain: ChainConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub health: HealthBands,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_api_port() -> u16 {
    19090
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            chain: ChainConfig::default(),
            execution: ExecutionConfig::default(),
            health: HealthBands::default(),
            api_port: default_api_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.backend.url, "http://127.0.0.1:3001");
        assert_eq!(config.chain.chain_id, 11_155_111);
        assert_eq!(config.chain.signature_scheme, SignatureScheme::RawHash);
        assert_eq!(config.execution.approval_poll_attempts, 20);
        assert_eq!(config.execution.receipt_timeout(), Duration::from_secs(60));
        assert_eq!(config.health.safe, 2.0);
        assert_eq!(config.api_port, 19090);

        let parsed: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.api_port, config.api_port);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{
            "backend": { "url": "https://api.example.org" },
            "execution": { "sync_countdown_secs": 5 },
            "health": { "safe": 3.0 }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.backend.url, "https://api.example.org");
        assert_eq!(config.backend.request_timeout_secs, 10);
        assert_eq!(config.execution.sync_countdown_secs, 5);
        assert_eq!(config.execution.receipt_timeout_secs, 60);
        assert_eq!(config.health.safe, 3.0);
        assert_eq!(config.health.warning, 1.5);
    }
}
