//! Application state shared across API handlers

use std::sync::Arc;

use debtx_backend::BackendClient;
use debtx_core::{AppConfig, BackendConfig, BackendError};
use evm_tx::WalletSession;
use tokio::sync::RwLock;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RwLock<AppConfig>,
    backend: RwLock<Option<BackendClient>>,
    wallet: WalletSession,
}

impl AppState {
    /// Create a new application state with default config
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create with a specific config
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config: RwLock::new(config),
                backend: RwLock::new(None),
                wallet: WalletSession::default(),
            }),
        }
    }

    /// Get current config
    pub async fn config(&self) -> AppConfig {
        self.inner.config.read().await.clone()
    }

    /// Point at a different backend and drop the cached client
    pub async fn set_backend_config(&self, backend: BackendConfig) {
        let mut config = self.inner.config.write().await;
        config.backend = backend;

        let mut client = self.inner.backend.write().await;
        *client = None;
    }

    /// Get or create the backend client
    pub async fn backend(&self) -> Result<BackendClient, BackendError> {
        {
            let client = self.inner.backend.read().await;
            if let Some(ref c) = *client {
                return Ok(c.clone());
            }
        }

        let mut cached = self.inner.backend.write().await;

        // Double-check after acquiring write lock
        if let Some(ref c) = *cached {
            return Ok(c.clone());
        }

        let config = self.inner.config.read().await;
        tracing::info!(url = %config.backend.url, "Creating backend client");
        let client = BackendClient::new(&config.backend).map_err(|e| {
            tracing::warn!(url = %config.backend.url, error = %e, "Failed to create backend client");
            e
        })?;
        *cached = Some(client.clone());
        Ok(client)
    }

    /// The connected wallet, if any
    pub fn wallet(&self) -> &WalletSession {
        &self.inner.wallet
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_backend_client_is_cached_until_reconfigured() {
        let state = AppState::new();
        let first = state.backend().await.unwrap();
        assert_eq!(first.base_url(), "http://127.0.0.1:3001");

        state
            .set_backend_config(BackendConfig {
                url: "http://backend.local:8080/".to_string(),
                request_timeout_secs: 5,
            })
            .await;
        let second = state.backend().await.unwrap();
        assert_eq!(second.base_url(), "http://backend.local:8080");
        assert_eq!(state.config().await.backend.request_timeout_secs, 5);
    }

    #[tokio::test]
    async fn test_wallet_starts_disconnected() {
        let state = AppState::new();
        assert!(state.wallet().address().await.is_none());
    }
}
