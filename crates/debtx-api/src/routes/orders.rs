//! Order API Routes
//!
//! - POST /orders/hash - Normalise a draft and return the hash to sign

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use debt_trade::{signing_digest, struct_hash, title_hash, OrderDomain};
use debtx_core::Error;

use super::{error_response, ApiResult};
use crate::dto::{ApiError, OrderHashRequest, OrderHashResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/hash", post(hash_order))
}

async fn hash_order(
    State(state): State<AppState>,
    Json(request): Json<OrderHashRequest>,
) -> ApiResult<OrderHashResponse> {
    let domain = match request.domain {
        Some(domain) => domain,
        None => OrderDomain::from_config(&state.config().await.chain),
    };
    if domain.verifying_contract.is_zero() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request("Router address is not configured")),
        ));
    }

    let order = request
        .draft
        .build()
        .map_err(|e| error_response(&Error::from(e)))?;

    let hash = struct_hash(&domain, &order);
    Ok(Json(OrderHashResponse {
        order_type: order.kind(),
        domain,
        title_hash: title_hash(order.title()),
        struct_hash: hash,
        digest: signing_digest(hash, domain.scheme),
    }))
}
