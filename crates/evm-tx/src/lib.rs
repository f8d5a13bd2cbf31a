//! evm-tx: Transaction plumbing for debtx
//!
//! Contract bindings, calldata builders, and the RPC and wallet seams the
//! order flows run against.

pub mod calls;
pub mod contracts;
pub mod provider;
pub mod retry;
pub mod rpc;
pub mod wallet;

pub use calls::{approve, ContractCall, RouterCalls};
pub use provider::AlloyRpc;
pub use retry::{poll_until, PollOutcome, RetryPolicy};
pub use rpc::{
    timed, wait_for_receipt, AccountData, ChainRpc, ContractReader, ReceiptStatus, ReserveTokens,
    RpcError, TxReceipt,
};
pub use wallet::{LocalWallet, WalletError, WalletSession, WalletSigner};
