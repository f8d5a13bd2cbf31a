//! Order lifecycle
//!
//! Status moves `ACTIVE -> EXECUTED | CANCELLED | EXPIRED` are decided by the
//! backend and the chain. Here we only classify whether an ACTIVE order can
//! be executed right now, and implement both ways of cancelling one.

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use debtx_backend::{BackendClient, CancelOrderRequest, OrderRecord};
use debtx_core::constants::HEALTH_FACTOR_DECIMALS;
use debtx_core::fixed_point::from_fixed_point;
use debtx_core::{Error, ExecutionConfig, OrderStatus, TxError, TxStage, UnixSeconds};
use evm_tx::contracts::OrderTitle;
use evm_tx::{wait_for_receipt, ChainRpc, RouterCalls, RpcError, WalletSigner};
use serde::{Deserialize, Serialize};

use crate::constants::order::CANCEL_MESSAGE_PREFIX;
use crate::order::OrderSignature;

/// `current <= trigger`, both 18-decimal fixed point
pub fn is_executable(current_hf: U256, trigger_hf: U256) -> bool {
    current_hf <= trigger_hf
}

/// Why an order can or cannot be executed now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Executability {
    Executable {
        current: f64,
        trigger: f64,
    },
    HealthFactorTooHigh {
        current: f64,
        trigger: f64,
        /// `current - trigger`
        gap: f64,
    },
    NotActive {
        status: OrderStatus,
    },
    OutsideWindow {
        start: UnixSeconds,
        end: UnixSeconds,
        now: UnixSeconds,
    },
}

impl Executability {
    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Executable { .. })
    }

    pub fn reason(&self) -> String {
        match self {
            Self::Executable { current, trigger } => format!(
                "Executable: health factor {:.4} is at or below the trigger {:.4}",
                current, trigger
            ),
            Self::HealthFactorTooHigh {
                current,
                trigger,
                gap,
            } => format!(
                "Health factor {:.4} is above the trigger {:.4} by {:.4}",
                current, trigger, gap
            ),
            Self::NotActive { status } => format!("Order is {}, not ACTIVE", status),
            Self::OutsideWindow { start, end, now } if now < start => format!(
                "Order window opens at {} ({}s from now)",
                start,
                start - now
            ),
            Self::OutsideWindow { end, .. } => format!("Order window closed at {}", end),
        }
    }
}

/// Classify an order against a freshly computed health factor (18-decimal).
/// Checks status first, then the validity window, then the trigger.
pub fn evaluate(
    status: OrderStatus,
    title: &OrderTitle,
    current_hf: U256,
    now: UnixSeconds,
) -> Executability {
    if status != OrderStatus::Active {
        return Executability::NotActive { status };
    }

    let start: UnixSeconds = title.startTime.saturating_to();
    let end: UnixSeconds = title.endTime.saturating_to();
    if now < start || now > end {
        return Executability::OutsideWindow { start, end, now };
    }

    let current = from_fixed_point(current_hf, HEALTH_FACTOR_DECIMALS);
    let trigger = from_fixed_point(title.triggerHF, HEALTH_FACTOR_DECIMALS);
    if is_executable(current_hf, title.triggerHF) {
        Executability::Executable { current, trigger }
    } else {
        Executability::HealthFactorTooHigh {
            current,
            trigger,
            gap: current - trigger,
        }
    }
}

/// Current unix time
pub fn now_secs() -> UnixSeconds {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Ways to take an order off the market
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cancellation {
    /// Seller-signed message, the backend marks the order CANCELLED
    OffChain { order_id: String },
    /// Invalidate this order's title on the router
    OnChainOrder { title: OrderTitle },
    /// Invalidate every order of the debt position's current nonce
    OnChainDebt { debt: Address },
}

pub fn cancel_message(order_id: &str) -> String {
    format!("{}{}", CANCEL_MESSAGE_PREFIX, order_id)
}

/// Sign the cancellation message for `order_id` (EIP-191)
pub async fn sign_cancellation(
    wallet: &dyn WalletSigner,
    order_id: &str,
) -> Result<CancelOrderRequest, Error> {
    let message = cancel_message(order_id);
    let signature = wallet
        .sign_message(message.as_bytes())
        .await
        .map_err(|e| Error::tx(TxStage::Cancellation, e.into()))?;

    Ok(CancelOrderRequest {
        seller: wallet.address(),
        message,
        signature: OrderSignature::from_signature(&signature).to_hex(),
    })
}

/// Off-chain cancellation through the backend
pub async fn cancel_off_chain(
    backend: &BackendClient,
    wallet: &dyn WalletSigner,
    order_id: &str,
) -> Result<OrderRecord, Error> {
    let request = sign_cancellation(wallet, order_id).await?;
    Ok(backend.cancel_order(order_id, &request).await?)
}

/// Only an elapsed deadline is a receipt timeout; anything else failed the
/// stage that sent the transaction.
pub(crate) fn receipt_error(
    err: RpcError,
    tx_hash: B256,
    stage: TxStage,
    timeout_secs: u64,
) -> Error {
    match err {
        RpcError::Timeout { .. } => Error::tx(
            TxStage::ReceiptWait,
            TxError::ReceiptTimeout {
                tx_hash: tx_hash.to_string(),
                secs: timeout_secs,
            },
        ),
        other => Error::tx(stage, other.to_tx_error()),
    }
}

/// On-chain cancellation; returns the mined transaction hash
pub async fn cancel_on_chain(
    rpc: Arc<dyn ChainRpc>,
    router: Address,
    cancellation: &Cancellation,
    config: &ExecutionConfig,
) -> Result<B256, Error> {
    let calls = RouterCalls::new(router);
    let call = match cancellation {
        Cancellation::OnChainOrder { title } => calls.cancel_order(title.clone()),
        Cancellation::OnChainDebt { debt } => calls.cancel_debt_orders(*debt),
        Cancellation::OffChain { .. } => {
            return Err(Error::Config(
                "off-chain cancellation does not send a transaction".to_string(),
            ))
        }
    };

    let tx_hash = rpc
        .send_transaction(call)
        .await
        .map_err(|e| Error::tx(TxStage::Cancellation, e.to_tx_error()))?;
    tracing::info!(tx_hash = %tx_hash, "Cancellation submitted");

    let receipt = wait_for_receipt(
        rpc.as_ref(),
        tx_hash,
        config.receipt_timeout(),
        config.receipt_poll_interval(),
    )
    .await
    .map_err(|e| receipt_error(e, tx_hash, TxStage::Cancellation, config.receipt_timeout_secs))?;

    if !receipt.succeeded() {
        return Err(Error::tx(
            TxStage::Cancellation,
            TxError::ExecutionReverted {
                reason: format!("cancellation {} reverted", tx_hash),
            },
        ));
    }
    Ok(tx_hash)
}
