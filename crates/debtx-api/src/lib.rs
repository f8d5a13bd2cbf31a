//! debtx-api: HTTP API layer for debtx
//!
//! Read-only market view and order hashing for the frontend.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::AppState;
