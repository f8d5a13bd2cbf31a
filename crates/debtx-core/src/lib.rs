//! debtx-core: Shared types, errors, fixed-point math and configuration
//!
//! This crate provides the foundational types used across the debtx workspace.

pub mod config;
pub mod errors;
pub mod fixed_point;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
