//! Retention-delayed account deletion

pub mod report;
pub mod scheduler;

pub use report::{DeletionRunReport, FailedDeletion, RunStop, StopHandle};
pub use scheduler::{DeletionLimits, DeletionScheduler};
