//! Quota derivation
//!
//! The granted quota is the largest size among the active tiers. A flagged
//! tier is active when its flag is `"1"`. The legacy tier is active only when
//! no flagged tier is, so a newer booking always supersedes an old flag-less
//! one. With nothing active the configured floor applies.

use crate::tariff::{TariffCatalog, TariffTier};
use provisio_core::{ClaimSet, HumanSize, ProvisioningConfig, Result};
use tracing::debug;

/// Pure quota rule over a tariff catalog.
#[derive(Debug, Clone)]
pub struct QuotaRules {
    catalog: TariffCatalog,
    floor: HumanSize,
}

impl QuotaRules {
    /// Rule over `catalog` with `floor` as the no-tier fallback
    pub fn new(catalog: TariffCatalog, floor: HumanSize) -> Self {
        Self { catalog, floor }
    }

    /// Build from configuration; falls back to the built-in table.
    pub fn from_config(config: &ProvisioningConfig) -> Result<Self> {
        let catalog = match &config.tariffs {
            Some(tiers) => TariffCatalog::from_config(tiers)?,
            None => TariffCatalog::builtin_in_namespace(&config.claim_namespace),
        };
        Ok(Self::new(catalog, config.quota_floor.clone()))
    }

    /// The underlying catalog
    pub fn catalog(&self) -> &TariffCatalog {
        &self.catalog
    }

    /// The no-tier fallback
    pub fn floor(&self) -> &HumanSize {
        &self.floor
    }

    fn any_flag_active(&self, claims: &ClaimSet) -> bool {
        self.catalog
            .flagged_tiers()
            .any(|tier| tier.is_flag_active(claims))
    }

    fn is_active(tier: &TariffTier, claims: &ClaimSet, any_flagged: bool) -> bool {
        if tier.is_legacy() {
            !any_flagged
        } else {
            tier.is_flag_active(claims)
        }
    }

    /// Tiers active for `claims`, in catalog order.
    pub fn active_tiers(&self, claims: &ClaimSet) -> Vec<&TariffTier> {
        let any_flagged = self.any_flag_active(claims);
        self.catalog
            .tiers()
            .iter()
            .filter(|tier| Self::is_active(tier, claims, any_flagged))
            .collect()
    }

    /// Maximum quota the claims entitle the customer to.
    pub fn derive_quota(&self, claims: &ClaimSet) -> &HumanSize {
        let any_flagged = self.any_flag_active(claims);
        let best = self
            .catalog
            .tiers()
            .iter()
            .filter(|tier| Self::is_active(tier, claims, any_flagged))
            .max_by_key(|tier| tier.size().bytes());

        match best {
            Some(tier) => {
                debug!(tier = tier.key(), quota = %tier.size(), "quota derived from tariff");
                tier.size()
            }
            None => {
                debug!(quota = %self.floor, "no tariff active, using quota floor");
                &self.floor
            }
        }
    }
}

impl Default for QuotaRules {
    fn default() -> Self {
        let config = ProvisioningConfig::default();
        Self::new(TariffCatalog::builtin(), config.quota_floor)
    }
}
