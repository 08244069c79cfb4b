//! Configuration system
//!
//! Hard defaults, string-keyed host overrides and TOML/JSON files.

pub mod provisioning;
pub mod traits;
pub mod validation;

pub use provisioning::{
    keys, DeletionSettings, FieldGroupConfig, ProvisioningConfig, RedirectUrls, TariffTierConfig,
    DEFAULT_CLAIM_NAMESPACE, DEFAULT_CUSTOMER_URL, DEFAULT_WITHDRAW_URL,
};
pub use traits::{read_config_file, ConfigSource, EnvSource, ProvisioConfig};
pub use validation::{ConfigValidator, ValidationError, ValidationResult};
