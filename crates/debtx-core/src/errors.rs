//! Error types for debtx

use thiserror::Error;

use crate::types::TxStage;

/// Core errors that can occur in debtx
#[derive(Debug, Error)]
pub enum Error {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("{stage} failed: {source}")]
    Transaction {
        stage: TxStage,
        #[source]
        source: TxError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Wrap a transaction error with the stage it happened in
    pub fn tx(stage: TxStage, source: TxError) -> Self {
        Self::Transaction { stage, source }
    }

    /// Stage of a failed transaction flow, if this is a transaction error
    pub fn stage(&self) -> Option<TxStage> {
        match self {
            Self::Transaction { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Backend(e) => e.error_code(),
            Self::Order(e) => e.error_code(),
            Self::Transaction { source, .. } => source.error_code(),
            Self::Config(_) => "config_error",
            Self::Serialization(_) => "serialization_error",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Backend(e) => e.status_code(),
            Self::Order(e) => e.status_code(),
            Self::Transaction { source, .. } => source.status_code(),
            Self::Config(_) | Self::Serialization(_) => 500,
        }
    }
}

/// Backend REST collaborator errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend unreachable at {url}: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("Backend returned error: {message}")]
    ApiError { message: String },

    #[error("Backend request to {path} timed out after {secs}s")]
    Timeout { path: String, secs: u64 },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Not found: {what}")]
    NotFound { what: String },
}

impl BackendError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "backend_unavailable",
            Self::ApiError { .. } => "backend_error",
            Self::Timeout { .. } => "timeout",
            Self::ParseError(_) => "parse_error",
            Self::NotFound { .. } => "not_found",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Timeout { .. } => 504,
            Self::Unavailable { .. } | Self::ApiError { .. } | Self::ParseError(_) => 502,
        }
    }
}

/// Order construction, validation and signing errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("Token {symbol} is not supported on chain {chain_id}")]
    TokenNotSupported { symbol: String, chain_id: u64 },

    #[error("Price unavailable for {symbol}")]
    PriceUnavailable { symbol: String },

    #[error("Signature invalid: {reason}")]
    SignatureInvalid { reason: String },

    #[error("Order is {status}, not active")]
    NotActive { status: String },
}

impl OrderError {
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount {
            message: message.into(),
        }
    }

    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidOrder {
            reason: reason.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidOrder { .. } => "invalid_order",
            Self::TokenNotSupported { .. } => "token_not_supported",
            Self::PriceUnavailable { .. } => "price_unavailable",
            Self::SignatureInvalid { .. } => "signature_invalid",
            Self::NotActive { .. } => "order_not_active",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount { .. } | Self::InvalidOrder { .. } => 400,
            Self::SignatureInvalid { .. } => 400,
            Self::TokenNotSupported { .. } | Self::NotActive { .. } => 422,
            Self::PriceUnavailable { .. } => 503,
        }
    }
}

/// Wallet and on-chain transaction errors
#[derive(Debug, Error)]
pub enum TxError {
    #[error("Wallet not connected")]
    WalletNotConnected,

    #[error("Insufficient allowance for {token}: need {required}, have {current}")]
    InsufficientAllowance {
        token: String,
        required: String,
        current: String,
    },

    #[error("Approval of {token} failed: {reason}")]
    ApprovalFailed { token: String, reason: String },

    #[error("User rejected the request")]
    UserRejected,

    #[error("Execution reverted: {reason}")]
    ExecutionReverted { reason: String },

    #[error("No receipt for {tx_hash} after {secs}s")]
    ReceiptTimeout { tx_hash: String, secs: u64 },

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("RPC error: {message}")]
    Rpc { message: String },
}

impl TxError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::WalletNotConnected => "wallet_not_connected",
            Self::InsufficientAllowance { .. } => "insufficient_allowance",
            Self::ApprovalFailed { .. } => "approval_failed",
            Self::UserRejected => "user_rejected",
            Self::ExecutionReverted { .. } => "execution_reverted",
            Self::ReceiptTimeout { .. } => "receipt_timeout",
            Self::Timeout { .. } => "timeout",
            Self::Rpc { .. } => "rpc_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::WalletNotConnected => 401,
            Self::UserRejected => 409,
            Self::InsufficientAllowance { .. }
            | Self::ApprovalFailed { .. }
            | Self::ExecutionReverted { .. } => 422,
            Self::ReceiptTimeout { .. } | Self::Timeout { .. } => 504,
            Self::Rpc { .. } => 502,
        }
    }
}

/// Result type alias for debtx operations
pub type Result<T> = std::result::Result<T, Error>;
