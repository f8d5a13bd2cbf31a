//! `ChainRpc` over an Alloy HTTP provider with a local signing wallet

use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::calls::ContractCall;
use crate::rpc::{ChainRpc, ReceiptStatus, RpcError, TxReceipt};
use crate::wallet::LocalWallet;

/// JSON-RPC node plus the wallet that pays for submissions.
/// Nonce, gas and chain id are filled by the provider.
#[derive(Clone)]
pub struct AlloyRpc {
    provider: DynProvider,
    sender: Address,
}

impl AlloyRpc {
    pub fn connect(rpc_url: &str, wallet: &LocalWallet) -> Result<Self, RpcError> {
        let url = rpc_url
            .parse()
            .map_err(|e| RpcError::Transport(format!("invalid RPC url {}: {}", rpc_url, e)))?;
        let sender = wallet.signer().address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(wallet.signer().clone()))
            .connect_http(url)
            .erased();

        tracing::info!(rpc_url, sender = %sender, "Chain RPC connected");
        Ok(Self { provider, sender })
    }
}

impl std::fmt::Debug for AlloyRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyRpc")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChainRpc for AlloyRpc {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, RpcError> {
        let tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(to)
            .with_input(input);
        self.provider
            .call(tx)
            .await
            .map_err(|e| RpcError::from_message(e.to_string()))
    }

    async fn send_transaction(&self, call: ContractCall) -> Result<B256, RpcError> {
        let tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(call.to)
            .with_input(call.input);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| RpcError::from_message(e.to_string()))?;
        let tx_hash = *pending.tx_hash();
        tracing::debug!(tx_hash = %tx_hash, to = %call.to, "Transaction submitted");
        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, RpcError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| RpcError::from_message(e.to_string()))?;

        Ok(receipt.map(|r| TxReceipt {
            tx_hash: r.transaction_hash(),
            status: if r.status() {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Reverted
            },
            block_number: r.block_number(),
        }))
    }
}
