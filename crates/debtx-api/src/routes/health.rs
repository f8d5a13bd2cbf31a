//! Health check endpoint

use axum::{extract::State, Json};

use crate::dto::HealthResponse;
use crate::AppState;

/// GET /health - API health plus backend reachability
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.config().await;
    let backend_online = match state.backend().await {
        Ok(client) => client.is_online().await,
        Err(_) => false,
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend_online,
        chain_id: config.chain.chain_id,
        wallet: state.wallet().address().await,
    })
}
