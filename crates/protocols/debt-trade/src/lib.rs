//! Debt Position Trading
//!
//! Owners of leveraged lending positions sell them, in whole or in part, via
//! off-chain signed orders that a buyer settles through the debt router.
//!
//! # Modules
//!
//! - `order` / `signer`: order model and typed-data hashing the router verifies
//! - `calculator`: health factor and sale quotes
//! - `lifecycle`: executability and cancellation
//! - `executor` / `phase`: approval and execution sequencing with phase reporting
//! - `fetch`: market view assembled from the backend

pub mod calculator;
pub mod constants;
pub mod executor;
pub mod fetch;
pub mod lifecycle;
pub mod order;
pub mod phase;
pub mod signer;
pub mod state;

// Re-exports
pub use calculator::*;
pub use executor::{ExecuteOptions, ExecuteRequest, OrderExecutor, PositionAssets};
pub use fetch::*;
pub use lifecycle::*;
pub use order::*;
pub use phase::{PhaseReporter, TxPhase};
pub use signer::*;
pub use state::*;
