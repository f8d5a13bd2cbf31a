//! debtx service library

use std::sync::Arc;

use anyhow::Context;
use debtx_api::AppState;
use debtx_core::AppConfig;
use evm_tx::{AlloyRpc, ContractReader, LocalWallet};

/// Path of the JSON config file
pub const CONFIG_ENV: &str = "DEBTX_CONFIG";
/// Hex private key of the local wallet, optional
pub const PRIVATE_KEY_ENV: &str = "DEBTX_PRIVATE_KEY";

/// Config from `DEBTX_CONFIG`, or defaults when unset
pub fn load_config() -> anyhow::Result<AppConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => AppConfig::from_file(&path).with_context(|| format!("loading {}", path)),
        Err(_) => {
            tracing::info!("{} not set, using default configuration", CONFIG_ENV);
            Ok(AppConfig::default())
        }
    }
}

/// Connect the local wallet and log its debt position slot on the router.
/// A failing read is logged; the wallet stays connected.
async fn connect_wallet(state: &AppState, config: &AppConfig, key: &str) -> anyhow::Result<()> {
    let wallet = LocalWallet::from_hex(key).context("parsing wallet key")?;
    let rpc = AlloyRpc::connect(&config.chain.rpc_url, &wallet)?;

    let reader = ContractReader::new(&rpc, config.execution.rpc_timeout());
    let owner = wallet.signer().address();
    match tokio::try_join!(
        reader.user_nonce(config.chain.router_address, owner),
        reader.predict_debt_address(config.chain.router_address, owner),
    ) {
        Ok((nonce, debt)) => {
            tracing::info!(owner = %owner, nonce = %nonce, next_debt = %debt, "Router account")
        }
        Err(e) => tracing::warn!(owner = %owner, error = %e, "Failed to read router account"),
    }

    state.wallet().connect(Arc::new(wallet)).await;
    Ok(())
}

/// Run the service until the server stops
pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debtx=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    tracing::info!("Starting debtx");

    let config = load_config()?;
    let port = config.api_port;
    let state = AppState::with_config(config.clone());

    if let Ok(key) = std::env::var(PRIVATE_KEY_ENV) {
        if let Err(e) = connect_wallet(&state, &config, &key).await {
            tracing::warn!(error = %e, "Wallet not connected");
        }
    }

    debtx_api::start_server(state, port)
        .await
        .context("API server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_env() {
        let path = std::env::temp_dir().join(format!("debtx-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "api_port": 20000, "backend": { "url": "http://b" } }"#).unwrap();

        std::env::set_var(CONFIG_ENV, &path);
        let config = load_config().unwrap();
        assert_eq!(config.api_port, 20000);
        assert_eq!(config.backend.url, "http://b");

        std::env::set_var(CONFIG_ENV, path.with_extension("missing"));
        assert!(load_config().is_err());

        std::env::remove_var(CONFIG_ENV);
        let _ = std::fs::remove_file(&path);
    }
}
