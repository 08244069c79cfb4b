//! Time sources and ISO-8601 durations
//!
//! Retention periods and execution budgets are configured as ISO-8601
//! duration strings (`P60D`, `P60DT1H`, `PT3H`). Calendar components (years,
//! months) are applied with calendar arithmetic, the rest as fixed spans.

use crate::errors::{ProvisionError, Result};
use chrono::{DateTime, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Wall-clock time provider.
pub trait TimeSource: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// Time source backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Convert epoch seconds to a UTC timestamp.
pub fn from_epoch_seconds(seconds: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| ProvisionError::invalid_claims(format!("timestamp {seconds} out of range")))
}

/// An ISO-8601 duration such as `P60D` or `P1Y2M3DT4H5M6S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IsoDuration {
    years: u32,
    months: u32,
    weeks: u32,
    days: u32,
    hours: u32,
    minutes: u32,
    seconds: u32,
}

impl IsoDuration {
    /// A duration of whole days
    pub fn days(days: u32) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    /// A duration of whole hours
    pub fn hours(hours: u32) -> Self {
        Self {
            hours,
            ..Self::default()
        }
    }

    /// A duration of whole minutes
    pub fn minutes(minutes: u32) -> Self {
        Self {
            minutes,
            ..Self::default()
        }
    }

    /// A duration of whole seconds
    pub fn seconds(seconds: u32) -> Self {
        Self {
            seconds,
            ..Self::default()
        }
    }

    /// Parse an ISO-8601 duration string.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || ProvisionError::config(format!("invalid ISO-8601 duration: '{text}'"));

        let body = text.trim().strip_prefix('P').ok_or_else(invalid)?;
        let (date_part, time_part) = match body.split_once('T') {
            Some((date, time)) => {
                if time.is_empty() {
                    return Err(invalid());
                }
                (date, Some(time))
            }
            None => (body, None),
        };
        if date_part.is_empty() && time_part.is_none() {
            return Err(invalid());
        }

        let mut duration = Self::default();
        for (value, designator) in components(date_part).ok_or_else(invalid)? {
            let slot = match designator {
                'Y' => &mut duration.years,
                'M' => &mut duration.months,
                'W' => &mut duration.weeks,
                'D' => &mut duration.days,
                _ => return Err(invalid()),
            };
            *slot = value;
        }
        if let Some(time_part) = time_part {
            for (value, designator) in components(time_part).ok_or_else(invalid)? {
                let slot = match designator {
                    'H' => &mut duration.hours,
                    'M' => &mut duration.minutes,
                    'S' => &mut duration.seconds,
                    _ => return Err(invalid()),
                };
                *slot = value;
            }
        }
        Ok(duration)
    }

    /// Whether the duration carries calendar (year/month) components.
    pub fn has_calendar_part(&self) -> bool {
        self.years > 0 || self.months > 0
    }

    fn fixed_seconds(&self) -> u64 {
        (u64::from(self.weeks) * 7 + u64::from(self.days)) * 86_400
            + u64::from(self.hours) * 3_600
            + u64::from(self.minutes) * 60
            + u64::from(self.seconds)
    }

    /// Add this duration to a timestamp, calendar part first.
    pub fn add_to(&self, start: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let overflow = || ProvisionError::internal(format!("{start} + {self} overflows"));
        let months = self
            .years
            .checked_mul(12)
            .and_then(|m| m.checked_add(self.months))
            .ok_or_else(overflow)?;
        let shifted = start
            .checked_add_months(Months::new(months))
            .ok_or_else(overflow)?;
        let fixed = chrono::Duration::seconds(i64::try_from(self.fixed_seconds()).map_err(|_| overflow())?);
        shifted.checked_add_signed(fixed).ok_or_else(overflow)
    }

    /// Convert to a fixed-length duration; calendar components are rejected.
    pub fn to_std(&self) -> Result<Duration> {
        if self.has_calendar_part() {
            return Err(ProvisionError::config(format!(
                "duration {self} has calendar components and no fixed length"
            )));
        }
        Ok(Duration::from_secs(self.fixed_seconds()))
    }
}

/// Split `60D` / `1H30M` into `(value, designator)` pairs.
fn components(part: &str) -> Option<Vec<(u32, char)>> {
    let mut out = Vec::new();
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            if digits.is_empty() {
                return None;
            }
            out.push((digits.parse().ok()?, c));
            digits.clear();
        }
    }
    if !digits.is_empty() {
        return None;
    }
    Some(out)
}

impl fmt::Display for IsoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("P")?;
        for (value, designator) in [
            (self.years, 'Y'),
            (self.months, 'M'),
            (self.weeks, 'W'),
            (self.days, 'D'),
        ] {
            if value > 0 {
                write!(f, "{value}{designator}")?;
            }
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0 {
            f.write_str("T")?;
            for (value, designator) in [(self.hours, 'H'), (self.minutes, 'M'), (self.seconds, 'S')] {
                if value > 0 {
                    write!(f, "{value}{designator}")?;
                }
            }
        }
        if *self == Self::default() {
            f.write_str("T0S")?;
        }
        Ok(())
    }
}

impl FromStr for IsoDuration {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IsoDuration {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<IsoDuration> for String {
    fn from(duration: IsoDuration) -> Self {
        duration.to_string()
    }
}
