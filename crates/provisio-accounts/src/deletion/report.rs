//! Deletion run outcome

use provisio_core::ProvisionError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why a run ended before the expired set was exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStop {
    /// Wall-clock budget spent before the next batch
    BudgetExhausted,
    /// Cooperative stop requested
    StopRequested,
    /// Fetching the next batch failed
    QueryFailed(String),
}

/// One account the run could not delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDeletion {
    /// Directory user id
    pub uid: String,
    /// Reported failure
    pub error: ProvisionError,
}

/// What one deletion run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRunReport {
    /// Size of every non-empty batch, in fetch order
    pub batches: Vec<usize>,
    /// Accounts deleted
    pub deleted: Vec<String>,
    /// Accounts whose deletion failed
    pub failed: Vec<FailedDeletion>,
    /// Accounts whose deletion exceeded the per-account budget
    pub timed_out: Vec<String>,
    /// Early stop, `None` when the run drained every expired account
    pub stop: Option<RunStop>,
}

impl DeletionRunReport {
    /// Whether the run reached an empty batch
    pub fn completed(&self) -> bool {
        self.stop.is_none()
    }

    /// Accounts looked at, whatever the outcome
    pub fn processed(&self) -> usize {
        self.deleted.len() + self.failed.len() + self.timed_out.len()
    }
}

/// Cooperative stop signal, honoured between account deletions.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    /// Fresh handle, not stopped
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running sweep to stop at the next safe point
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Clear a previous request before the next run
    pub fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}
