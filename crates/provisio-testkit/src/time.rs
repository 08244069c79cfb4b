//! Controllable wall clock

use chrono::{DateTime, Duration, Utc};
use provisio_core::TimeSource;
use std::sync::{Arc, Mutex};

/// Controllable time source for deterministic testing
#[derive(Debug, Clone)]
pub struct ControllableTimeSource {
    current_time: Arc<Mutex<DateTime<Utc>>>,
}

impl ControllableTimeSource {
    /// Create a time source starting at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Create a time source starting at an RFC 3339 timestamp
    pub fn at(rfc3339: &str) -> Self {
        Self::new(
            DateTime::parse_from_rfc3339(rfc3339)
                .expect("valid RFC 3339 timestamp")
                .with_timezone(&Utc),
        )
    }

    /// Advance time by given number of seconds
    pub fn advance_time(&self, seconds: i64) {
        self.advance(Duration::seconds(seconds));
    }

    /// Advance time by a duration
    pub fn advance(&self, by: Duration) {
        let mut current = self.current_time.lock().unwrap();
        *current += by;
    }

    /// Set absolute time
    pub fn set_time(&self, time: DateTime<Utc>) {
        let mut current = self.current_time.lock().unwrap();
        *current = time;
    }

    /// Get current time
    pub fn current(&self) -> DateTime<Utc> {
        *self.current_time.lock().unwrap()
    }

    /// Shared handle usable wherever a `TimeSource` is expected
    pub fn shared(&self) -> Arc<dyn TimeSource> {
        Arc::new(self.clone())
    }
}

impl TimeSource for ControllableTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.current()
    }
}
