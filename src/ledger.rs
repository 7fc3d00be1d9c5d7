//! Deployment ledger: the most recent successful deployments, newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Number of records retained.
pub const LEDGER_CAPACITY: usize = 10;

/// Summary of one completed deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub token_name: String,
    pub token_symbol: String,
    pub token_address: String,
    pub tx_hash: String,
    pub has_image: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LedgerState {
    records: VecDeque<DeploymentRecord>,
    total_recorded: u64,
}

/// Bounded, shared deployment history.
#[derive(Debug, Clone, Default)]
pub struct DeploymentLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl DeploymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a record, evicting the oldest when at capacity.
    pub async fn record(&self, record: DeploymentRecord) {
        let mut state = self.state.write().await;
        state.records.push_front(record);
        state.records.truncate(LEDGER_CAPACITY);
        state.total_recorded += 1;
    }

    /// Up to `n` records, newest first.
    pub async fn list(&self, n: usize) -> Vec<DeploymentRecord> {
        let state = self.state.read().await;
        state.records.iter().take(n).cloned().collect()
    }

    /// Currently retained records (at most [`LEDGER_CAPACITY`]).
    pub async fn count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Deployments recorded since process start, including evicted ones.
    pub async fn total_recorded(&self) -> u64 {
        self.state.read().await.total_recorded
    }
}
