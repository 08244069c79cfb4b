//! Tariff tiers and the tariff catalog
//!
//! A catalog is an ordered list of tiers. Each tier grants a storage size and
//! is activated by a flag claim set to `"1"`. At most one tier carries no
//! flag: the legacy tier for customers booked before tariff flags existed.

use provisio_core::config::{TariffTierConfig, DEFAULT_CLAIM_NAMESPACE};
use provisio_core::{ClaimSet, HumanSize, ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default tolerance (GB) when matching old numeric quota records.
pub const DEFAULT_SEARCH_RANGE: u64 = 1;

/// One storage tariff level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffTier {
    key: String,
    display_name: String,
    size: HumanSize,
    trigger_flag: Option<String>,
    legacy_quota: Option<u64>,
    legacy_alias: Option<String>,
    search_range: u64,
}

impl TariffTier {
    /// A tier activated by `flag == "1"`
    pub fn flagged(key: impl Into<String>, size: HumanSize, flag: impl Into<String>) -> Self {
        Self::build(key.into(), size, Some(flag.into()))
    }

    /// The flag-less legacy tier
    pub fn legacy(key: impl Into<String>, size: HumanSize) -> Self {
        Self::build(key.into(), size, None)
    }

    fn build(key: String, size: HumanSize, trigger_flag: Option<String>) -> Self {
        Self {
            display_name: key.clone(),
            key,
            size,
            trigger_flag,
            legacy_quota: None,
            legacy_alias: None,
            search_range: DEFAULT_SEARCH_RANGE,
        }
    }

    /// Set the group / display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Map old numeric quota records (GB, within `search_range`) onto this tier
    pub fn with_legacy_quota(mut self, quota_gb: u64, search_range: u64) -> Self {
        self.legacy_quota = Some(quota_gb);
        self.search_range = search_range;
        self
    }

    /// Map an old textual quota record onto this tier
    pub fn with_legacy_alias(mut self, alias: impl Into<String>) -> Self {
        self.legacy_alias = Some(alias.into());
        self
    }

    /// Unique tier key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Group / display name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Storage granted by this tier
    pub fn size(&self) -> &HumanSize {
        &self.size
    }

    /// Claim activating this tier, `None` for the legacy tier
    pub fn trigger_flag(&self) -> Option<&str> {
        self.trigger_flag.as_deref()
    }

    /// Old numeric quota (GB) mapped onto this tier
    pub fn legacy_quota(&self) -> Option<u64> {
        self.legacy_quota
    }

    /// Old textual quota mapped onto this tier
    pub fn legacy_alias(&self) -> Option<&str> {
        self.legacy_alias.as_deref()
    }

    /// Whether this is the flag-less legacy tier
    pub fn is_legacy(&self) -> bool {
        self.trigger_flag.is_none()
    }

    /// Whether the tier's flag is asserted. The legacy tier is never
    /// activated by claims directly.
    pub fn is_flag_active(&self, claims: &ClaimSet) -> bool {
        self.trigger_flag
            .as_deref()
            .is_some_and(|flag| claims.flag(flag))
    }

    fn matches_legacy_gb(&self, gb: u64) -> bool {
        self.legacy_quota
            .is_some_and(|quota| quota.abs_diff(gb) <= self.search_range)
    }
}

impl TryFrom<&TariffTierConfig> for TariffTier {
    type Error = ProvisionError;

    fn try_from(config: &TariffTierConfig) -> Result<Self> {
        if config.key.trim().is_empty() {
            return Err(ProvisionError::config("tariff tier key must not be empty"));
        }
        let mut tier = Self::build(
            config.key.clone(),
            config.size.clone(),
            config.flag.clone(),
        );
        if let Some(name) = &config.name {
            tier.display_name = name.clone();
        }
        tier.legacy_quota = config.legacy_quota;
        tier.legacy_alias = config.legacy_alias.clone();
        tier.search_range = config.search_range.unwrap_or(DEFAULT_SEARCH_RANGE);
        Ok(tier)
    }
}

/// Ordered, validated collection of tariff tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TariffCatalog {
    tiers: Vec<TariffTier>,
}

impl TariffCatalog {
    /// Validate and wrap a tier list.
    ///
    /// Keys must be unique and at most one tier may lack a trigger flag.
    pub fn new(tiers: Vec<TariffTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(ProvisionError::config("tariff catalog must not be empty"));
        }

        let mut keys = BTreeSet::new();
        for tier in &tiers {
            if !keys.insert(tier.key.as_str()) {
                return Err(ProvisionError::config(format!(
                    "duplicate tariff key '{}'",
                    tier.key
                )));
            }
        }

        let legacy: Vec<&str> = tiers
            .iter()
            .filter(|tier| tier.is_legacy())
            .map(TariffTier::key)
            .collect();
        if legacy.len() > 1 {
            return Err(ProvisionError::config(format!(
                "at most one tariff may have no flag, found {}",
                legacy.join(", ")
            )));
        }

        Ok(Self { tiers })
    }

    /// Build a catalog from configured tiers.
    pub fn from_config(tiers: &[TariffTierConfig]) -> Result<Self> {
        let tiers = tiers
            .iter()
            .map(TariffTier::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(tiers)
    }

    /// The compiled-in tariff table.
    pub fn builtin() -> Self {
        Self::builtin_in_namespace(DEFAULT_CLAIM_NAMESPACE)
    }

    /// The compiled-in table with flags resolved in `namespace`.
    pub fn builtin_in_namespace(namespace: &str) -> Self {
        let gb = |n: u64| HumanSize::from_bytes(n * 1024 * 1024 * 1024);
        let tb = |n: u64| HumanSize::from_bytes(n * 1024 * 1024 * 1024 * 1024);
        let flag = |suffix: &str| format!("{namespace}{suffix}");

        let tiers = vec![
            // very old S25 bookings where only the product flag is set
            TariffTier::legacy("NOFLAGS", gb(25)),
            TariffTier::flagged("FREE3", gb(3), flag("f048")),
            TariffTier::flagged("FREE10", gb(10), flag("f460")),
            TariffTier::flagged("S15", gb(15), flag("f049")).with_legacy_quota(15, 1),
            TariffTier::flagged("S25", gb(25), flag("f467")).with_legacy_quota(25, 1),
            TariffTier::flagged("S64", gb(64), flag("f008"))
                .with_display_name("s64")
                .with_legacy_quota(64, 1),
            TariffTier::flagged("M100", gb(100), flag("f468")).with_legacy_quota(100, 1),
            TariffTier::flagged("L500", gb(500), flag("f469")).with_legacy_quota(500, 1),
            TariffTier::flagged("XL1", tb(1), flag("f471"))
                .with_legacy_quota(1024, 1)
                .with_legacy_alias("1 TB"),
            TariffTier::flagged("XXL5", tb(5), flag("f051"))
                .with_legacy_quota(5120, 1)
                .with_legacy_alias("5 TB"),
        ];

        Self { tiers }
    }

    /// All tiers in catalog order
    pub fn tiers(&self) -> &[TariffTier] {
        &self.tiers
    }

    /// Tier by key
    pub fn get(&self, key: &str) -> Option<&TariffTier> {
        self.tiers.iter().find(|tier| tier.key == key)
    }

    /// The flag-less legacy tier, if configured
    pub fn legacy_tier(&self) -> Option<&TariffTier> {
        self.tiers.iter().find(|tier| tier.is_legacy())
    }

    /// Tiers carrying a trigger flag
    pub fn flagged_tiers(&self) -> impl Iterator<Item = &TariffTier> {
        self.tiers.iter().filter(|tier| !tier.is_legacy())
    }

    /// Tier granting exactly `size`; flagged tiers win over the legacy tier.
    pub fn tier_for_size(&self, size: &HumanSize) -> Option<&TariffTier> {
        self.flagged_tiers()
            .find(|tier| tier.size == *size)
            .or_else(|| self.legacy_tier().filter(|tier| tier.size == *size))
    }

    /// Map an old stored quota record onto a tier.
    ///
    /// A bare number is read as GB and matched against each tier's legacy
    /// quota within its search range. Anything else is read as a
    /// human-readable size and matched by legacy alias, then by exact size.
    pub fn match_legacy_quota(&self, record: &str) -> Option<&TariffTier> {
        let record = record.trim();
        if record.is_empty() {
            return None;
        }

        if let Ok(gb) = record.parse::<u64>() {
            return self.tiers.iter().find(|tier| tier.matches_legacy_gb(gb));
        }

        if let Some(tier) = self.tiers.iter().find(|tier| {
            tier.legacy_alias
                .as_deref()
                .is_some_and(|alias| alias.eq_ignore_ascii_case(record))
        }) {
            return Some(tier);
        }

        HumanSize::parse(record)
            .ok()
            .and_then(|size| self.tier_for_size(&size))
    }
}

impl Default for TariffCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
