//! Bundle of every rule the account lifecycle consults.

use crate::displayname::DisplaynameRules;
use crate::flags::{AccountFlags, RedirectPolicy};
use crate::quota::QuotaRules;
use provisio_core::{ProvisioningConfig, Result};

/// All claim rules built from one configuration.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// Quota derivation
    pub quota: QuotaRules,
    /// Displayname derivation
    pub displayname: DisplaynameRules,
    /// Product flag predicates
    pub flags: AccountFlags,
    /// Redirect selection
    pub redirects: RedirectPolicy,
}

impl RuleSet {
    /// Build every rule from `config`; an invalid tariff table is fatal.
    pub fn from_config(config: &ProvisioningConfig) -> Result<Self> {
        Ok(Self {
            quota: QuotaRules::from_config(config)?,
            displayname: DisplaynameRules::from_config(config),
            flags: AccountFlags::in_namespace(&config.claim_namespace),
            redirects: RedirectPolicy::from_config(config),
        })
    }
}
