//! API route handlers

pub mod health;
pub mod market;
pub mod orders;

use axum::{http::StatusCode, routing::get, Json, Router};
use debtx_core::Error;

use crate::dto::ApiError;
use crate::AppState;

pub(crate) type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/market", market::router())
        .nest("/orders", orders::router())
        .with_state(state)
}

/// Map a domain error to its HTTP status and body
pub(crate) fn error_response(e: &Error) -> (StatusCode, Json<ApiError>) {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiError::from(e)))
}
