//! Human-readable storage sizes
//!
//! Tariff tables state sizes as text (`"25 GB"`, `"1 TB"`). Comparison must be
//! exact, so parsing uses integer arithmetic over powers of 1024 and rejects
//! magnitudes that do not resolve to a whole number of bytes.

use crate::errors::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const UNITS: [(&str, u32); 6] = [
    ("B", 0),
    ("KB", 1),
    ("MB", 2),
    ("GB", 3),
    ("TB", 4),
    ("PB", 5),
];

/// A storage size with its human-readable label.
///
/// Equality, ordering and hashing consider only the byte count, so
/// `"1 TB"` and `"1024 GB"` compare equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HumanSize {
    bytes: u64,
    label: String,
}

impl HumanSize {
    /// Parse `<magnitude> <unit>`, e.g. `"25 GB"` or `"1.5 TB"`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(|| ProvisionError::config(format!("size '{text}' has no unit")))?;
        let (magnitude, unit) = trimmed.split_at(split);
        let magnitude = magnitude.trim();
        let unit = unit.trim().to_ascii_uppercase();

        let power = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, power)| *power)
            .ok_or_else(|| ProvisionError::config(format!("invalid size unit: {unit}")))?;

        let bytes = exact_bytes(magnitude, power)
            .ok_or_else(|| ProvisionError::config(format!("invalid size magnitude in '{text}'")))?;

        Ok(Self {
            bytes,
            label: format!("{magnitude} {unit}"),
        })
    }

    /// Build a size from a raw byte count, labelled with the largest exact unit.
    pub fn from_bytes(bytes: u64) -> Self {
        let (unit, power) = UNITS
            .iter()
            .rev()
            .find(|(_, power)| bytes % 1024u64.pow(*power) == 0)
            .copied()
            .unwrap_or(("B", 0));
        let label = if bytes == 0 {
            "0 B".to_string()
        } else {
            format!("{} {unit}", bytes / 1024u64.pow(power))
        };
        Self { bytes, label }
    }

    /// Exact size in bytes
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Normalised label, e.g. `"25 GB"`
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// `magnitude * 1024^power`, exact, or `None` on overflow/fractional bytes.
fn exact_bytes(magnitude: &str, power: u32) -> Option<u64> {
    let (whole, fraction) = match magnitude.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (magnitude, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let digits = format!("{whole}{fraction}");
    let numerator: u128 = digits.parse().ok()?;
    let denominator = 10u128.checked_pow(u32::try_from(fraction.len()).ok()?)?;
    let scaled = numerator.checked_mul(1024u128.checked_pow(power)?)?;
    if scaled % denominator != 0 {
        return None;
    }
    u64::try_from(scaled / denominator).ok()
}

impl fmt::Display for HumanSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl FromStr for HumanSize {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HumanSize {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<HumanSize> for String {
    fn from(size: HumanSize) -> Self {
        size.label
    }
}

impl PartialEq for HumanSize {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for HumanSize {}

impl PartialOrd for HumanSize {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HumanSize {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl Hash for HumanSize {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}
