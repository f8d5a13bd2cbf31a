//! Wallet seam
//!
//! Signing is delegated to whatever wallet is connected. `WalletSession`
//! holds the current one; flows that need a signer fail with
//! `TxError::WalletNotConnected` when the session is empty.

use std::sync::Arc;

use alloy::primitives::{Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use debtx_core::TxError;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("user rejected the request")]
    Rejected,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),
}

impl From<WalletError> for TxError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected => TxError::UserRejected,
            other => TxError::Rpc {
                message: other.to_string(),
            },
        }
    }
}

/// A connected account able to produce ECDSA signatures
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Sign a 32-byte digest as is
    async fn sign_hash(&self, hash: B256) -> Result<Signature, WalletError>;

    /// EIP-191 personal message signature
    async fn sign_message(&self, message: &[u8]) -> Result<Signature, WalletError>;
}

/// Key held in process memory
#[derive(Clone)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
}

impl LocalWallet {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Parse a hex private key, with or without `0x`
    pub fn from_hex(key: &str) -> Result<Self, WalletError> {
        let signer: PrivateKeySigner = key
            .trim()
            .parse()
            .map_err(|e| WalletError::InvalidKey(format!("{e}")))?;
        Ok(Self::new(signer))
    }

    pub fn random() -> Self {
        Self::new(PrivateKeySigner::random())
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.signer.address())
            .finish()
    }
}

#[async_trait]
impl WalletSigner for LocalWallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_hash(&self, hash: B256) -> Result<Signature, WalletError> {
        self.signer
            .sign_hash(&hash)
            .await
            .map_err(|e| WalletError::Signing(e.to_string()))
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, WalletError> {
        self.signer
            .sign_message(message)
            .await
            .map_err(|e| WalletError::Signing(e.to_string()))
    }
}

/// The currently connected wallet, if any
#[derive(Default)]
pub struct WalletSession {
    current: RwLock<Option<Arc<dyn WalletSigner>>>,
}

impl WalletSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a wallet. If one is already connected it is kept and returned.
    pub async fn connect(&self, wallet: Arc<dyn WalletSigner>) -> Arc<dyn WalletSigner> {
        // Fast path: read lock
        {
            let guard = self.current.read().await;
            if let Some(existing) = guard.as_ref() {
                return existing.clone();
            }
        }

        // Slow path: write lock with double-check
        let mut guard = self.current.write().await;
        if let Some(existing) = guard.as_ref() {
            return existing.clone();
        }
        tracing::info!(address = %wallet.address(), "Wallet connected");
        *guard = Some(wallet.clone());
        wallet
    }

    /// Replace whatever is connected
    pub async fn switch(&self, wallet: Arc<dyn WalletSigner>) {
        tracing::info!(address = %wallet.address(), "Wallet switched");
        *self.current.write().await = Some(wallet);
    }

    pub async fn disconnect(&self) {
        if let Some(previous) = self.current.write().await.take() {
            tracing::info!(address = %previous.address(), "Wallet disconnected");
        }
    }

    pub async fn address(&self) -> Option<Address> {
        self.current.read().await.as_ref().map(|w| w.address())
    }

    /// The connected wallet or `WalletNotConnected`
    pub async fn require(&self) -> Result<Arc<dyn WalletSigner>, TxError> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(TxError::WalletNotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;

    // Hardhat/Anvil account #0
    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_local_wallet_signatures_recover() {
        let wallet = LocalWallet::from_hex(KEY).unwrap();
        assert_eq!(
            wallet.address().to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );

        let digest = keccak256(b"order");
        let sig = wallet.sign_hash(digest).await.unwrap();
        assert_eq!(sig.recover_address_from_prehash(&digest).unwrap(), wallet.address());

        let sig = wallet.sign_message(b"Cancel order 42").await.unwrap();
        assert_eq!(
            sig.recover_address_from_msg(b"Cancel order 42").unwrap(),
            wallet.address()
        );
    }

    #[test]
    fn test_bad_key_rejected() {
        assert!(matches!(
            LocalWallet::from_hex("0x1234"),
            Err(WalletError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_session_connect_is_idempotent() {
        let session = WalletSession::new();
        assert!(matches!(
            session.require().await,
            Err(TxError::WalletNotConnected)
        ));

        let first = LocalWallet::random();
        let first_address = first.address();
        session.connect(Arc::new(first)).await;
        let kept = session.connect(Arc::new(LocalWallet::random())).await;
        assert_eq!(kept.address(), first_address);
        assert_eq!(session.address().await, Some(first_address));

        let other = LocalWallet::random();
        let other_address = other.address();
        session.switch(Arc::new(other)).await;
        assert_eq!(session.address().await, Some(other_address));

        session.disconnect().await;
        assert!(session.require().await.is_err());
    }

    #[test]
    fn test_rejection_maps_to_user_rejected() {
        assert!(matches!(
            TxError::from(WalletError::Rejected),
            TxError::UserRejected
        ));
    }
}
