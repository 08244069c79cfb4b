//! Provisio Core - provisioning primitives
//!
//! Foundation types shared by the rule engine and the account lifecycle:
//!
//! - `ClaimSet`: read-only view over identity provider claims
//! - `HumanSize`: exact storage sizes with human-readable labels
//! - `IsoDuration`, `TimeSource`: retention periods, budgets and clocks
//! - `ProvisioningConfig`: hard defaults plus host overrides
//! - `ProvisionError`: the workspace-wide error type

#![forbid(unsafe_code)]

/// Claim sets asserted by identity providers
pub mod claims;

/// Configuration loading and validation
pub mod config;

/// Unified error handling
pub mod errors;

/// Human-readable storage sizes
pub mod size;

/// Clocks and ISO-8601 durations
pub mod time;

pub use claims::ClaimSet;
pub use config::{ConfigSource, ProvisioConfig, ProvisioningConfig};
pub use errors::{ProvisionError, Result};
pub use size::HumanSize;
pub use time::{from_epoch_seconds, IsoDuration, SystemTimeSource, TimeSource};
