//! Provisio Testing Infrastructure
//!
//! In-memory implementations of the host contracts, a controllable clock and
//! claim fixtures shared by the integration suites.

//!
//! # Usage
//!
//! ```rust,no_run
//! use provisio_testkit::*;
//!
//! # async fn example() {
//! let clock = ControllableTimeSource::at("2024-01-01T00:00:00Z");
//! let directory = InMemoryDirectory::new(provisio_core::IsoDuration::days(60));
//! let claims = fixtures::booked_claims();
//! # }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod directory;
pub mod fixtures;
pub mod preferences;
pub mod time;
pub mod tracing_init;

pub use directory::InMemoryDirectory;
pub use preferences::MemoryPreferences;
pub use time::ControllableTimeSource;
pub use tracing_init::init_test_tracing;
