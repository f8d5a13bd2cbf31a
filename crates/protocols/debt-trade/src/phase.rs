//! Transaction phase reporting
//!
//! Callers subscribe to a `watch` channel and render the current phase.
//! Only the latest phase is kept; intermediate ones may be skipped by slow
//! subscribers.

use std::time::Duration;

use alloy::primitives::B256;
use debtx_core::TxStage;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TxPhase {
    Idle,
    Submitted { tx_hash: B256 },
    WaitingForReceipt { tx_hash: B256 },
    /// Mined; waiting for the backend indexer to catch up
    WaitingForSync { remaining_secs: u64 },
    Success { tx_hash: B256 },
    Failed { stage: TxStage, message: String },
}

impl TxPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Failed { .. })
    }
}

/// Publishes the phase of the flow currently in progress
#[derive(Debug, Clone)]
pub struct PhaseReporter {
    tx: watch::Sender<TxPhase>,
}

impl Default for PhaseReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TxPhase::Idle);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<TxPhase> {
        self.tx.subscribe()
    }

    pub fn set(&self, phase: TxPhase) {
        tracing::debug!(?phase, "Transaction phase");
        // no receivers is fine
        self.tx.send_replace(phase);
    }

    pub fn current(&self) -> TxPhase {
        self.tx.borrow().clone()
    }

    pub fn reset(&self) {
        self.set(TxPhase::Idle);
    }

    /// Count down `secs` seconds, publishing `WaitingForSync` once per
    /// second, then publish `Success`. Cosmetic; settlement is already final.
    pub async fn sync_countdown(&self, tx_hash: B256, secs: u64) {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        for remaining in (1..=secs).rev() {
            ticker.tick().await;
            self.set(TxPhase::WaitingForSync {
                remaining_secs: remaining,
            });
        }
        if secs > 0 {
            ticker.tick().await;
        }
        self.set(TxPhase::Success { tx_hash });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_phase_json_is_camel_case() {
        let json = serde_json::to_value(TxPhase::WaitingForSync { remaining_secs: 7 }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"phase": "waitingForSync", "remainingSecs": 7})
        );

        let json = serde_json::to_value(TxPhase::Submitted {
            tx_hash: B256::ZERO,
        })
        .unwrap();
        assert_eq!(json["phase"], "submitted");
        assert!(json.get("txHash").is_some());
        assert!(json.get("tx_hash").is_none());
    }

    #[test]
    fn test_starts_idle() {
        let reporter = PhaseReporter::new();
        assert_eq!(reporter.current(), TxPhase::Idle);
        assert!(!reporter.current().is_terminal());
    }

    #[test]
    fn test_subscribers_see_latest() {
        let reporter = PhaseReporter::new();
        let rx = reporter.subscribe();
        let hash = B256::repeat_byte(1);
        reporter.set(TxPhase::Submitted { tx_hash: hash });
        reporter.set(TxPhase::WaitingForReceipt { tx_hash: hash });
        assert_eq!(*rx.borrow(), TxPhase::WaitingForReceipt { tx_hash: hash });
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_countdown_ticks_each_second() {
        let reporter = PhaseReporter::new();
        let mut rx = reporter.subscribe();
        let hash = B256::repeat_byte(2);
        let start = Instant::now();

        let task = {
            let reporter = reporter.clone();
            tokio::spawn(async move { reporter.sync_countdown(hash, 10).await })
        };

        let mut seen = Vec::new();
        loop {
            rx.changed().await.unwrap();
            let phase = rx.borrow_and_update().clone();
            if let TxPhase::WaitingForSync { remaining_secs } = phase {
                seen.push(remaining_secs);
            }
            if phase.is_terminal() {
                break;
            }
        }
        task.await.unwrap();

        assert_eq!(seen, (1..=10).rev().collect::<Vec<_>>());
        assert_eq!(reporter.current(), TxPhase::Success { tx_hash: hash });
        // first tick is immediate, ten more one second apart
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn test_phase_json_shape() {
        let json = serde_json::to_value(TxPhase::WaitingForSync { remaining_secs: 7 }).unwrap();
        assert_eq!(json["phase"], "waitingForSync");
        assert_eq!(json["remaining_secs"], 7);
    }
}
