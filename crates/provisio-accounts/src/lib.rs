//! Provisio Accounts - account lifecycle
//!
//! Turns claim evaluations into directory mutations and purges withdrawn
//! accounts once their retention period has passed.
//!
//! # Layout
//!
//! - `directory`: the `AccountDirectory` contract the host implements
//! - `preferences`: per-user key/value contract and the `DeletionLedger`
//! - `identity`: provider and user id resolution
//! - `state_machine`: `AccountStateMachine` producing `AccountDecision`s
//! - `deletion`: the `DeletionScheduler` sweep
//!
//! The deletion deadline is the only state shared between the state machine
//! (sole writer of mark/unmark) and the scheduler (sole reader-then-deleter).

#![forbid(unsafe_code)]

pub mod decision;
pub mod deletion;
pub mod directory;
pub mod identity;
pub mod preferences;
pub mod state_machine;

pub use decision::{AccountDecision, AccountState, DecisionReason};
pub use deletion::{
    DeletionLimits, DeletionRunReport, DeletionScheduler, FailedDeletion, RunStop, StopHandle,
};
pub use directory::{AccountDirectory, AccountLookup, AccountRecord, AccountUpdate, NewAccount};
pub use identity::{IdentityProvider, IdentityResolver};
pub use preferences::{DeletionLedger, UserPreferences};
pub use state_machine::{AccountChangeEvent, AccountStateMachine};
