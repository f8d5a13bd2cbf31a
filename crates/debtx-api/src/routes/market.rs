//! Market API Routes
//!
//! - GET /market/orders - Orders with recomputed health and executability
//! - GET /market/orders/{id} - Single order
//! - GET /market/positions/{debt_address}/health - Position health

use alloy::primitives::Address;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use debt_trade::{fetch_market, fetch_order, fetch_position_health};
use debt_trade::{MarketOrder, MarketResponse, PositionHealth};
use debtx_backend::{BackendClient, OrderQuery};
use debtx_core::Error;

use super::{error_response, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/positions/{debt_address}/health", get(position_health))
}

async fn backend(state: &AppState) -> Result<BackendClient, Error> {
    Ok(state.backend().await?)
}

async fn list_orders(
    State(state): State<AppState>,
    Query(mut query): Query<OrderQuery>,
) -> ApiResult<MarketResponse> {
    let config = state.config().await;
    if query.chain_id.is_none() {
        query.chain_id = Some(config.chain.chain_id);
    }

    let result = async {
        let client = backend(&state).await?;
        fetch_market(&client, &query, &config.health).await
    }
    .await;

    result.map(Json).map_err(|e| {
        tracing::warn!(error = %e, "Failed to fetch market");
        error_response(&e)
    })
}

async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<MarketOrder> {
    let config = state.config().await;
    let result = async {
        let client = backend(&state).await?;
        fetch_order(&client, &id, &config.health).await
    }
    .await;

    result.map(Json).map_err(|e| error_response(&e))
}

async fn position_health(
    State(state): State<AppState>,
    Path(debt_address): Path<Address>,
) -> ApiResult<PositionHealth> {
    let config = state.config().await;
    let result = async {
        let client = backend(&state).await?;
        fetch_position_health(&client, debt_address, &config.health).await
    }
    .await;

    result.map(Json).map_err(|e| error_response(&e))
}
