//! Chain RPC seam
//!
//! `ChainRpc` is the boundary to the node and the connected wallet: raw
//! `eth_call` reads, transaction submission and receipt lookup. Nonce and gas
//! handling stay behind it. `ContractReader` layers typed, timed contract
//! reads on top.

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use debtx_core::TxError;
use thiserror::Error;

use crate::calls::ContractCall;
use crate::contracts::{IDebtRouter, IPool, IPriceOracle, IERC20};
use crate::retry::{poll_until, PollOutcome, RetryPolicy};

/// Wallet error texts that mean the user declined the request.
/// Wallets word this differently, so this is a best-effort match.
const REJECTION_PATTERNS: &[&str] = &[
    "user rejected",
    "user denied",
    "rejected the request",
    "action_rejected",
    "request rejected",
    "user cancelled",
];

/// Errors from the RPC / wallet collaborator
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("{0}")]
    Transport(String),

    #[error("execution reverted: {reason}")]
    Reverted { reason: String },

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("failed to decode {what}: {message}")]
    Decode { what: &'static str, message: String },
}

impl RpcError {
    /// Classify a raw error message from a node or wallet
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if let Some(idx) = lower.find("execution reverted") {
            let reason = message
                .get(idx + "execution reverted".len()..)
                .unwrap_or_default()
                .trim_start_matches(':')
                .trim()
                .to_string();
            return Self::Reverted {
                reason: if reason.is_empty() {
                    "no reason given".to_string()
                } else {
                    reason
                },
            };
        }
        Self::Transport(message)
    }

    /// Heuristic: does the message look like a wallet rejection?
    pub fn is_user_rejection(&self) -> bool {
        let text = self.to_string().to_lowercase();
        REJECTION_PATTERNS.iter().any(|p| text.contains(p))
    }

    /// Map to the transaction error taxonomy
    pub fn to_tx_error(&self) -> TxError {
        if self.is_user_rejection() {
            return TxError::UserRejected;
        }
        match self {
            Self::Reverted { reason } => TxError::ExecutionReverted {
                reason: reason.clone(),
            },
            Self::Timeout { operation, secs } => TxError::Timeout {
                operation: operation.clone(),
                secs: *secs,
            },
            Self::Transport(message) => TxError::Rpc {
                message: message.clone(),
            },
            Self::Decode { .. } => TxError::Rpc {
                message: self.to_string(),
            },
        }
    }
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Minimal receipt view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub status: ReceiptStatus,
    pub block_number: Option<u64>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Node + wallet collaborator
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Account that signs and pays for submitted transactions
    fn sender(&self) -> Address;

    /// `eth_call`
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, RpcError>;

    /// Sign and broadcast; returns the transaction hash
    async fn send_transaction(&self, call: ContractCall) -> Result<B256, RpcError>;

    /// `None` while the transaction is still pending
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError>;
}

/// Run an RPC future with a deadline
pub async fn timed<T>(
    operation: &str,
    timeout: Duration,
    fut: impl Future<Output = Result<T, RpcError>>,
) -> Result<T, RpcError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| RpcError::Timeout {
            operation: operation.to_string(),
            secs: timeout.as_secs(),
        })?
}

/// Poll for a receipt until it appears or `timeout` elapses. The deadline
/// covers the whole wait, including a node that stops answering mid-poll.
pub async fn wait_for_receipt<R: ChainRpc + ?Sized>(
    rpc: &R,
    tx_hash: B256,
    timeout: Duration,
    interval: Duration,
) -> Result<TxReceipt, RpcError> {
    let interval_ms = interval.as_millis().max(1);
    let attempts = timeout.as_millis().div_ceil(interval_ms).max(1) as u32;
    let policy = RetryPolicy::new(attempts, interval);
    let operation = format!("receipt for {}", tx_hash);

    let outcome = timed(&operation, timeout, async {
        poll_until(policy, |attempt| async move {
            tracing::trace!(tx_hash = %tx_hash, attempt, "Polling receipt");
            rpc.transaction_receipt(tx_hash).await
        })
        .await
    })
    .await?;

    match outcome {
        PollOutcome::Ready { value, .. } => Ok(value),
        PollOutcome::Exhausted { .. } => Err(RpcError::Timeout {
            operation,
            secs: timeout.as_secs(),
        }),
    }
}

/// Pool account snapshot in base currency (8 decimals)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountData {
    pub total_collateral_base: U256,
    pub total_debt_base: U256,
    pub current_liquidation_threshold: U256,
    /// 18-decimal fixed point
    pub health_factor: U256,
}

impl AccountData {
    /// Collateral minus debt, zero when underwater
    pub fn net_equity_base(&self) -> U256 {
        self.total_collateral_base
            .saturating_sub(self.total_debt_base)
    }
}

/// Tokenized positions of a reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveTokens {
    pub a_token: Address,
    pub stable_debt_token: Address,
    pub variable_debt_token: Address,
}

/// Typed contract reads with a per-call timeout
pub struct ContractReader<'a, R: ?Sized> {
    rpc: &'a R,
    timeout: Duration,
}

impl<'a, R: ChainRpc + ?Sized> ContractReader<'a, R> {
    pub fn new(rpc: &'a R, timeout: Duration) -> Self {
        Self { rpc, timeout }
    }

    async fn read<C: SolCall>(
        &self,
        operation: &'static str,
        to: Address,
        call: C,
    ) -> Result<C::Return, RpcError> {
        let raw = timed(
            operation,
            self.timeout,
            self.rpc.call(to, call.abi_encode().into()),
        )
        .await?;
        C::abi_decode_returns(&raw).map_err(|e| RpcError::Decode {
            what: operation,
            message: e.to_string(),
        })
    }

    pub async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, RpcError> {
        self.read("allowance", token, IERC20::allowanceCall { owner, spender })
            .await
    }

    pub async fn balance_of(&self, token: Address, account: Address) -> Result<U256, RpcError> {
        self.read("balanceOf", token, IERC20::balanceOfCall { account })
            .await
    }

    pub async fn decimals(&self, token: Address) -> Result<u8, RpcError> {
        self.read("decimals", token, IERC20::decimalsCall {}).await
    }

    pub async fn account_data(&self, pool: Address, user: Address) -> Result<AccountData, RpcError> {
        let ret = self
            .read("getUserAccountData", pool, IPool::getUserAccountDataCall { user })
            .await?;
        Ok(AccountData {
            total_collateral_base: ret.totalCollateralBase,
            total_debt_base: ret.totalDebtBase,
            current_liquidation_threshold: ret.currentLiquidationThreshold,
            health_factor: ret.healthFactor,
        })
    }

    pub async fn reserve_tokens(
        &self,
        pool: Address,
        asset: Address,
    ) -> Result<ReserveTokens, RpcError> {
        let ret = self
            .read("getReserveData", pool, IPool::getReserveDataCall { asset })
            .await?;
        Ok(ReserveTokens {
            a_token: ret.aTokenAddress,
            stable_debt_token: ret.stableDebtTokenAddress,
            variable_debt_token: ret.variableDebtTokenAddress,
        })
    }

    pub async fn asset_price(&self, oracle: Address, asset: Address) -> Result<U256, RpcError> {
        self.read("getAssetPrice", oracle, IPriceOracle::getAssetPriceCall { asset })
            .await
    }

    pub async fn user_nonce(&self, router: Address, owner: Address) -> Result<U256, RpcError> {
        self.read("userNonces", router, IDebtRouter::userNoncesCall { owner })
            .await
    }

    pub async fn predict_debt_address(
        &self,
        router: Address,
        owner: Address,
    ) -> Result<Address, RpcError> {
        self.read(
            "predictDebtAddress",
            router,
            IDebtRouter::predictDebtAddressCall { owner },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct PendingRpc {
        polls: AtomicU32,
        ready_after: u32,
    }

    #[async_trait]
    impl ChainRpc for PendingRpc {
        fn sender(&self) -> Address {
            Address::ZERO
        }

        async fn call(&self, _to: Address, _input: Bytes) -> Result<Bytes, RpcError> {
            std::future::pending().await
        }

        async fn send_transaction(&self, _call: ContractCall) -> Result<B256, RpcError> {
            Ok(B256::ZERO)
        }

        async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.ready_after {
                Ok(Some(TxReceipt {
                    tx_hash,
                    status: ReceiptStatus::Success,
                    block_number: Some(7),
                }))
            } else {
                Ok(None)
            }
        }
    }

    #[test]
    fn test_classify_revert_message() {
        let err = RpcError::from_message("server returned an error response: execution reverted: HF too high");
        match &err {
            RpcError::Reverted { reason } => assert_eq!(reason, "HF too high"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            err.to_tx_error(),
            TxError::ExecutionReverted { .. }
        ));
    }

    #[test]
    fn test_user_rejection_heuristic() {
        for msg in [
            "MetaMask Tx Signature: User denied transaction signature.",
            "user rejected transaction (action=\"sendTransaction\", code=ACTION_REJECTED)",
            "The user rejected the request.",
        ] {
            let err = RpcError::from_message(msg);
            assert!(err.is_user_rejection(), "{msg}");
            assert!(matches!(err.to_tx_error(), TxError::UserRejected));
        }
        assert!(!RpcError::from_message("connection refused").is_user_rejection());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_receipt_polls_until_mined() {
        let rpc = PendingRpc {
            polls: AtomicU32::new(0),
            ready_after: 3,
        };
        let receipt = wait_for_receipt(
            &rpc,
            B256::repeat_byte(1),
            Duration::from_secs(60),
            Duration::from_secs(2),
        )
        .await
        .unwrap();
        assert!(receipt.succeeded());
        assert_eq!(rpc.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_receipt_times_out() {
        let rpc = PendingRpc {
            polls: AtomicU32::new(0),
            ready_after: u32::MAX,
        };
        let err = wait_for_receipt(
            &rpc,
            B256::repeat_byte(1),
            Duration::from_secs(10),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RpcError::Timeout { secs: 10, .. }));
        assert_eq!(rpc.polls.load(Ordering::SeqCst), 5);
    }

    struct UnresponsiveRpc;

    #[async_trait]
    impl ChainRpc for UnresponsiveRpc {
        fn sender(&self) -> Address {
            Address::ZERO
        }

        async fn call(&self, _to: Address, _input: Bytes) -> Result<Bytes, RpcError> {
            std::future::pending().await
        }

        async fn send_transaction(&self, _call: ContractCall) -> Result<B256, RpcError> {
            Ok(B256::ZERO)
        }

        async fn transaction_receipt(&self, _tx_hash: B256) -> Result<Option<TxReceipt>, RpcError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_receipt_bounded_when_node_hangs() {
        let started = tokio::time::Instant::now();
        let err = wait_for_receipt(
            &UnresponsiveRpc,
            B256::repeat_byte(1),
            Duration::from_secs(60),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RpcError::Timeout { secs: 60, .. }));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_time_out() {
        let rpc = PendingRpc {
            polls: AtomicU32::new(0),
            ready_after: 1,
        };
        let reader = ContractReader::new(&rpc, Duration::from_secs(10));
        let err = reader
            .allowance(Address::ZERO, Address::ZERO, Address::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Timeout { secs: 10, .. }));
        assert!(matches!(err.to_tx_error(), TxError::Timeout { .. }));
    }
}
