//! Retention-delayed deletion sweep
//!
//! A run pages through accounts whose deadline lies before `now` and deletes
//! them one at a time. Failures and per-account timeouts are logged and the
//! run moves on; the next run picks the leftovers up again. Deleted accounts
//! drop out of the expired set, so the page offset only advances past the
//! accounts that remain.

use super::report::{DeletionRunReport, FailedDeletion, RunStop, StopHandle};
use crate::directory::AccountDirectory;
use chrono::{DateTime, Utc};
use provisio_core::config::DeletionSettings;
use provisio_core::{ProvisionError, ProvisioningConfig, Result, SystemTimeSource, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Fixed-length limits of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionLimits {
    /// Accounts fetched per batch
    pub batch_size: usize,
    /// Wall-clock budget of a run, checked before each batch
    pub run_budget: Duration,
    /// Budget of a single deletion
    pub account_budget: Duration,
    /// Host scheduling interval
    pub interval: Duration,
}

impl DeletionLimits {
    /// Convert configured durations; calendar durations are rejected.
    pub fn from_settings(settings: &DeletionSettings) -> Result<Self> {
        if settings.batch_size == 0 {
            return Err(ProvisionError::config("deletion batch size must be positive"));
        }
        Ok(Self {
            batch_size: settings.batch_size,
            run_budget: settings.run_budget.to_std()?,
            account_budget: settings.account_budget.to_std()?,
            interval: settings.interval.to_std()?,
        })
    }
}

impl Default for DeletionLimits {
    fn default() -> Self {
        Self {
            batch_size: 10,
            run_budget: Duration::from_secs(3 * 3600),
            account_budget: Duration::from_secs(30 * 60),
            interval: Duration::from_secs(3 * 3600),
        }
    }
}

/// Periodic purge of withdrawn accounts past their deadline.
///
/// Runs must not overlap; the host scheduler guarantees single-instance
/// execution.
pub struct DeletionScheduler<D: ?Sized> {
    directory: Arc<D>,
    limits: DeletionLimits,
    clock: Arc<dyn TimeSource>,
    stop: StopHandle,
}

impl<D: AccountDirectory + ?Sized> DeletionScheduler<D> {
    /// Scheduler over `directory`
    pub fn new(directory: Arc<D>, limits: DeletionLimits) -> Self {
        Self {
            directory,
            limits,
            clock: Arc::new(SystemTimeSource),
            stop: StopHandle::new(),
        }
    }

    /// Build from configuration
    pub fn from_config(directory: Arc<D>, config: &ProvisioningConfig) -> Result<Self> {
        Ok(Self::new(
            directory,
            DeletionLimits::from_settings(&config.deletion)?,
        ))
    }

    /// Clock measuring the run budget
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Limits in effect
    pub fn limits(&self) -> &DeletionLimits {
        &self.limits
    }

    /// Handle for stopping a run from elsewhere
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn budget_spent(&self, started: DateTime<Utc>) -> bool {
        let elapsed = self.clock.now().signed_duration_since(started);
        elapsed
            .to_std()
            .is_ok_and(|elapsed| elapsed >= self.limits.run_budget)
    }

    /// Delete every account whose deadline lies strictly before `now`.
    #[instrument(skip(self), fields(batch_size = self.limits.batch_size))]
    pub async fn run(&self, now: DateTime<Utc>) -> DeletionRunReport {
        let started = self.clock.now();
        let mut report = DeletionRunReport::default();
        let mut offset = 0usize;

        info!("deletion run started");
        loop {
            if self.budget_spent(started) {
                warn!(processed = report.processed(), "deletion budget exhausted, leaving rest for next run");
                report.stop = Some(RunStop::BudgetExhausted);
                break;
            }
            if self.stop.is_stop_requested() {
                info!("deletion run stopped on request");
                report.stop = Some(RunStop::StopRequested);
                break;
            }

            let batch = match self
                .directory
                .find_expired_deletions(now, self.limits.batch_size, offset)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    error!(offset, error = %e, "fetching expired accounts failed");
                    report.stop = Some(RunStop::QueryFailed(e.to_string()));
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }
            debug!(offset, size = batch.len(), "processing deletion batch");
            report.batches.push(batch.len());

            let mut remaining = 0usize;
            for uid in batch {
                if self.stop.is_stop_requested() {
                    info!("deletion run stopped on request");
                    report.stop = Some(RunStop::StopRequested);
                    return self.finish(report);
                }
                if !self.delete_one(uid, &mut report).await {
                    remaining += 1;
                }
            }
            offset += remaining;
        }

        self.finish(report)
    }

    /// Returns whether the account is gone.
    async fn delete_one(&self, uid: String, report: &mut DeletionRunReport) -> bool {
        match tokio::time::timeout(self.limits.account_budget, self.directory.delete(&uid)).await {
            Ok(Ok(())) => {
                info!(uid = %uid, "account deleted");
                report.deleted.push(uid);
                true
            }
            Ok(Err(e)) => {
                error!(uid = %uid, error = %e, "account deletion failed");
                report.failed.push(FailedDeletion { uid, error: e });
                false
            }
            Err(_) => {
                warn!(
                    uid = %uid,
                    budget_secs = self.limits.account_budget.as_secs(),
                    "account deletion exceeded its budget, skipped"
                );
                report.timed_out.push(uid);
                false
            }
        }
    }

    fn finish(&self, report: DeletionRunReport) -> DeletionRunReport {
        info!(
            batches = report.batches.len(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            timed_out = report.timed_out.len(),
            completed = report.completed(),
            "deletion run finished"
        );
        report
    }
}
