//! Provisioning configuration
//!
//! Every value has a hard fallback default. Overrides arrive either as a
//! TOML/JSON file or as string-keyed host configuration; unparsable values
//! fail at load time rather than on a later request.

use super::traits::{read_config_file, ProvisioConfig};
use super::validation::ConfigValidator;
use crate::errors::{ProvisionError, Result};
use crate::size::HumanSize;
use crate::time::IsoDuration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Default redirect for withdrawn or never-booked customers
pub const DEFAULT_WITHDRAW_URL: &str = "https://cloud.telekom-dienste.de/tarife";
/// Default redirect for the preserve, OTT and access processes
pub const DEFAULT_CUSTOMER_URL: &str = "https://telekom.example.com/";
/// Default claim namespace prefixed to displayname search fields
pub const DEFAULT_CLAIM_NAMESPACE: &str = "urn:telekom.com:";

/// Host configuration keys
#[allow(missing_docs)]
pub mod keys {
    pub const RETENTION: &str = "userretention";
    pub const WITHDRAW_URL: &str = "userwithdrawurl";
    pub const PRESERVE_URL: &str = "userpreserveurl";
    pub const OTT_URL: &str = "userotturl";
    pub const ACCESS_URL: &str = "useraccessurl";
    pub const BATCH_SIZE: &str = "deletionbatchsize";
    pub const RUN_BUDGET: &str = "deletionjobbudget";
    pub const ACCOUNT_BUDGET: &str = "deletionaccountbudget";
    pub const INTERVAL: &str = "deletioninterval";
    pub const TARIFFS: &str = "tariffs";
    pub const QUOTA_FLOOR: &str = "quotafloor";
    pub const DISPLAYNAME_SEARCH: &str = "displaynamesearch";
    pub const CLAIM_NAMESPACE: &str = "claimnamespace";
}

/// Redirect targets, one per withdrawal cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectUrls {
    /// Generic withdrawal / tariff information page
    pub withdraw: String,
    /// Target for the "preserve" process
    pub preserve: String,
    /// Target for over-the-top customers
    pub ott: String,
    /// Target for access customers
    pub access: String,
}

impl Default for RedirectUrls {
    fn default() -> Self {
        Self {
            withdraw: DEFAULT_WITHDRAW_URL.to_string(),
            preserve: DEFAULT_CUSTOMER_URL.to_string(),
            ott: DEFAULT_CUSTOMER_URL.to_string(),
            access: DEFAULT_CUSTOMER_URL.to_string(),
        }
    }
}

/// Deletion sweep settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeletionSettings {
    /// Accounts fetched per batch
    pub batch_size: usize,
    /// Wall-clock budget for one run
    pub run_budget: IsoDuration,
    /// Budget for deleting a single account
    pub account_budget: IsoDuration,
    /// Interval at which the host should invoke the sweep
    pub interval: IsoDuration,
}

impl Default for DeletionSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            run_budget: IsoDuration::hours(3),
            account_budget: IsoDuration::minutes(30),
            interval: IsoDuration::hours(3),
        }
    }
}

/// One configured tariff tier, as written in host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffTierConfig {
    /// Unique tier key, e.g. `S25`
    pub key: String,
    /// Group / display name; defaults to the key
    #[serde(default)]
    pub name: Option<String>,
    /// Storage granted by the tier
    pub size: HumanSize,
    /// Claim whose value `"1"` activates the tier
    #[serde(default)]
    pub flag: Option<String>,
    /// Old numeric quota record (GB) mapped onto this tier
    #[serde(default)]
    pub legacy_quota: Option<u64>,
    /// Old textual quota record mapped onto this tier
    #[serde(default)]
    pub legacy_alias: Option<String>,
    /// Tolerance (GB) when matching `legacy_quota`
    #[serde(default)]
    pub search_range: Option<u64>,
}

/// One displayname search group: claim suffixes joined with spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldGroupConfig {
    /// Plain list of suffixes
    Fields(Vec<String>),
    /// Suffixes with options
    Detailed {
        /// Claim suffixes
        fields: Vec<String>,
        /// Cut e-mail values at the `@`
        #[serde(default)]
        strip_mail_domain: bool,
    },
}

impl FieldGroupConfig {
    /// Claim suffixes of the group
    pub fn fields(&self) -> &[String] {
        match self {
            Self::Fields(fields) | Self::Detailed { fields, .. } => fields,
        }
    }

    /// Whether e-mail domains are stripped from resolved values
    pub fn strip_mail_domain(&self) -> bool {
        match self {
            Self::Fields(_) => false,
            Self::Detailed {
                strip_mail_domain, ..
            } => *strip_mail_domain,
        }
    }
}

/// Complete provisioning configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningConfig {
    /// Grace period between withdrawal and deletion
    pub retention: IsoDuration,
    /// Redirect targets
    pub redirects: RedirectUrls,
    /// Deletion sweep settings
    pub deletion: DeletionSettings,
    /// Tariff table override; `None` selects the built-in table
    pub tariffs: Option<Vec<TariffTierConfig>>,
    /// Quota granted when no tier is active
    pub quota_floor: HumanSize,
    /// Displayname search override; `None` selects the built-in order
    pub displayname_search: Option<Vec<FieldGroupConfig>>,
    /// Namespace prefixed to displayname search suffixes
    pub claim_namespace: String,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            retention: IsoDuration::days(60),
            redirects: RedirectUrls::default(),
            deletion: DeletionSettings::default(),
            tariffs: None,
            quota_floor: HumanSize::from_bytes(3 * 1024 * 1024 * 1024),
            displayname_search: None,
            claim_namespace: DEFAULT_CLAIM_NAMESPACE.to_string(),
        }
    }
}

fn parse_duration(key: &str, value: &str) -> Result<IsoDuration> {
    IsoDuration::parse(value).map_err(|e| ProvisionError::config(format!("{key}: {e}")))
}

/// A tariff override needs unique, non-blank keys and at most one flag-less tier.
fn tariff_table_is_consistent(tiers: &Option<Vec<TariffTierConfig>>) -> bool {
    let Some(tiers) = tiers else {
        return true;
    };
    let mut seen = BTreeSet::new();
    let unique_keys = tiers
        .iter()
        .all(|tier| !tier.key.trim().is_empty() && seen.insert(tier.key.as_str()));
    let flagless = tiers.iter().filter(|tier| tier.flag.is_none()).count();
    !tiers.is_empty() && unique_keys && flagless <= 1
}

fn parse_json<T: serde::de::DeserializeOwned>(key: &str, value: &str) -> Result<T> {
    serde_json::from_str(value).map_err(|e| ProvisionError::config(format!("{key}: {e}")))
}

impl ProvisioConfig for ProvisioningConfig {
    const KEYS: &'static [&'static str] = &[
        keys::RETENTION,
        keys::WITHDRAW_URL,
        keys::PRESERVE_URL,
        keys::OTT_URL,
        keys::ACCESS_URL,
        keys::BATCH_SIZE,
        keys::RUN_BUDGET,
        keys::ACCOUNT_BUDGET,
        keys::INTERVAL,
        keys::TARIFFS,
        keys::QUOTA_FLOOR,
        keys::DISPLAYNAME_SEARCH,
        keys::CLAIM_NAMESPACE,
    ];

    fn load_from_file(path: &Path) -> Result<Self> {
        let config: Self = read_config_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut validator = ConfigValidator::new();
        validator
            .required(keys::CLAIM_NAMESPACE, &self.claim_namespace)
            .url(keys::WITHDRAW_URL, &self.redirects.withdraw)
            .url(keys::PRESERVE_URL, &self.redirects.preserve)
            .url(keys::OTT_URL, &self.redirects.ott)
            .url(keys::ACCESS_URL, &self.redirects.access)
            .range(
                keys::BATCH_SIZE,
                u64::try_from(self.deletion.batch_size).unwrap_or(u64::MAX),
                Some(1),
                Some(10_000),
            )
            .custom(
                keys::RUN_BUDGET,
                &self.deletion.run_budget,
                |d| d.to_std().is_ok_and(|d| !d.is_zero()),
                "must be a non-zero fixed-length duration",
            )
            .custom(
                keys::ACCOUNT_BUDGET,
                &self.deletion.account_budget,
                |d| d.to_std().is_ok_and(|d| !d.is_zero()),
                "must be a non-zero fixed-length duration",
            )
            .custom(
                keys::RETENTION,
                &self.retention,
                |d| *d != IsoDuration::default(),
                "must not be empty",
            )
            .custom(
                keys::DISPLAYNAME_SEARCH,
                &self.displayname_search,
                |groups| {
                    groups.as_ref().map_or(true, |groups| {
                        !groups.is_empty() && groups.iter().all(|g| !g.fields().is_empty())
                    })
                },
                "search groups must be non-empty",
            )
            .custom(
                keys::TARIFFS,
                &self.tariffs,
                tariff_table_is_consistent,
                "tiers need unique keys and at most one tier without a flag",
            );
        validator.result()?;
        Ok(())
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            keys::RETENTION => self.retention = parse_duration(key, value)?,
            keys::WITHDRAW_URL => self.redirects.withdraw = value.to_string(),
            keys::PRESERVE_URL => self.redirects.preserve = value.to_string(),
            keys::OTT_URL => self.redirects.ott = value.to_string(),
            keys::ACCESS_URL => self.redirects.access = value.to_string(),
            keys::BATCH_SIZE => {
                self.deletion.batch_size = value
                    .trim()
                    .parse()
                    .map_err(|_| ProvisionError::config(format!("{key}: invalid batch size '{value}'")))?;
            }
            keys::RUN_BUDGET => self.deletion.run_budget = parse_duration(key, value)?,
            keys::ACCOUNT_BUDGET => self.deletion.account_budget = parse_duration(key, value)?,
            keys::INTERVAL => self.deletion.interval = parse_duration(key, value)?,
            keys::TARIFFS => self.tariffs = Some(parse_json(key, value)?),
            keys::QUOTA_FLOOR => {
                self.quota_floor = HumanSize::parse(value)
                    .map_err(|e| ProvisionError::config(format!("{key}: {e}")))?;
            }
            keys::DISPLAYNAME_SEARCH => self.displayname_search = Some(parse_json(key, value)?),
            keys::CLAIM_NAMESPACE => self.claim_namespace = value.to_string(),
            _ => {
                return Err(ProvisionError::config(format!(
                    "Unknown configuration key: {key}"
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn empty_source_yields_hard_defaults() {
        let config = ProvisioningConfig::from_source(&source(&[])).unwrap();
        assert_eq!(config, ProvisioningConfig::default());
        assert_eq!(config.retention.to_string(), "P60D");
        assert_eq!(config.redirects.withdraw, DEFAULT_WITHDRAW_URL);
        assert_eq!(config.deletion.batch_size, 10);
        assert_eq!(config.quota_floor.label(), "3 GB");
    }

    #[test]
    fn string_keys_override_defaults() {
        let config = ProvisioningConfig::from_source(&source(&[
            ("userretention", "P60DT1H"),
            ("userotturl", "https://ott.example.com/"),
            ("deletionbatchsize", "25"),
            ("deletionaccountbudget", "PT5M"),
        ]))
        .unwrap();
        assert_eq!(config.retention.to_string(), "P60DT1H");
        assert_eq!(config.redirects.ott, "https://ott.example.com/");
        assert_eq!(config.deletion.batch_size, 25);
        assert_eq!(config.deletion.account_budget, IsoDuration::minutes(5));
    }

    #[test]
    fn unparsable_retention_is_fatal() {
        let err = ProvisioningConfig::from_source(&source(&[("userretention", "60 days")]))
            .unwrap_err();
        assert_matches!(err, ProvisionError::Config { .. });
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = ProvisioningConfig::from_source(&source(&[("deletionbatchsize", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("deletionbatchsize"));
    }

    #[test]
    fn calendar_run_budget_is_rejected() {
        let err = ProvisioningConfig::from_source(&source(&[("deletionjobbudget", "P1M")]))
            .unwrap_err();
        assert!(err.to_string().contains("deletionjobbudget"));
    }

    #[test]
    fn tariff_and_search_overrides_parse_from_json() {
        let config = ProvisioningConfig::from_source(&source(&[
            (
                "tariffs",
                r#"[{"key":"FREE3","size":"3 GB","flag":"urn:telekom.com:f048"},
                    {"key":"XL1","size":"1 TB","flag":"urn:telekom.com:f471","legacy_quota":1024,"legacy_alias":"1 TB","search_range":1}]"#,
            ),
            (
                "displaynamesearch",
                r#"[["zusa","name"],{"fields":["mainEmail"],"strip_mail_domain":true}]"#,
            ),
        ]))
        .unwrap();

        let tariffs = config.tariffs.unwrap();
        assert_eq!(tariffs.len(), 2);
        assert_eq!(tariffs[1].size.label(), "1 TB");
        assert_eq!(tariffs[1].legacy_quota, Some(1024));

        let search = config.displayname_search.unwrap();
        assert_eq!(search[0].fields(), ["zusa".to_string(), "name".to_string()]);
        assert!(!search[0].strip_mail_domain());
        assert!(search[1].strip_mail_domain());
    }

    #[test]
    fn bad_tariff_size_is_fatal() {
        let err = ProvisioningConfig::from_source(&source(&[(
            "tariffs",
            r#"[{"key":"BROKEN","size":"25 GiB"}]"#,
        )]))
        .unwrap_err();
        assert_matches!(err, ProvisionError::Config { .. });
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut config = ProvisioningConfig::default();
        assert!(config.set_from_string("colour", "blue").is_err());
    }

    #[test]
    fn toml_document_deserializes() {
        let config: ProvisioningConfig = toml::from_str(
            r#"
            retention = "P30D"
            quota_floor = "10 GB"

            [redirects]
            withdraw = "https://example.com/withdraw"

            [deletion]
            batch_size = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.retention, IsoDuration::days(30));
        assert_eq!(config.quota_floor.label(), "10 GB");
        assert_eq!(config.redirects.withdraw, "https://example.com/withdraw");
        assert_eq!(config.redirects.ott, DEFAULT_CUSTOMER_URL);
        assert_eq!(config.deletion.batch_size, 50);
        assert_eq!(config.deletion.run_budget, IsoDuration::hours(3));
        config.validate().unwrap();
    }

    #[test]
    fn duplicate_tariff_keys_are_rejected() {
        let err = ProvisioningConfig::from_source(&source(&[(
            "tariffs",
            r#"[{"key":"S25","size":"25 GB","flag":"urn:telekom.com:f467"},
                {"key":"S25","size":"100 GB","flag":"urn:telekom.com:f468"}]"#,
        )]))
        .unwrap_err();
        assert_matches!(err, ProvisionError::Config { .. });
        assert!(err.to_string().contains("tariffs"));
    }

    #[test]
    fn two_flagless_tariffs_are_rejected() {
        let err = ProvisioningConfig::from_source(&source(&[(
            "tariffs",
            r#"[{"key":"LEGACY","size":"3 GB"},{"key":"OLD","size":"5 GB"}]"#,
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("tariffs"));
    }

    #[test]
    fn empty_tariff_table_is_rejected() {
        let err = ProvisioningConfig::from_source(&source(&[("tariffs", "[]")])).unwrap_err();
        assert!(err.to_string().contains("tariffs"));
    }

    #[test]
    fn blank_claim_namespace_is_rejected() {
        let err = ProvisioningConfig::from_source(&source(&[("claimnamespace", "  ")]))
            .unwrap_err();
        assert_matches!(err, ProvisionError::Config { .. });
        assert!(err.to_string().contains("claimnamespace"));
    }

    /// Scratch file under the system temp dir, removed on drop.
    struct ScratchFile(std::path::PathBuf);

    impl ScratchFile {
        fn new(name: &str, content: &str) -> Self {
            let path = std::env::temp_dir().join(format!(
                "provisio-{}-{name}",
                std::process::id()
            ));
            std::fs::write(&path, content).unwrap();
            Self(path)
        }
    }

    impl Drop for ScratchFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn loads_toml_file() {
        let file = ScratchFile::new(
            "config.toml",
            r#"
            retention = "P30D"

            [deletion]
            batch_size = 25
            "#,
        );
        let config = ProvisioningConfig::load_from_file(&file.0).unwrap();
        assert_eq!(config.retention, IsoDuration::days(30));
        assert_eq!(config.deletion.batch_size, 25);
        assert_eq!(config.redirects, RedirectUrls::default());
    }

    #[test]
    fn loads_json_file() {
        let file = ScratchFile::new(
            "config.json",
            r#"{"claim_namespace":"urn:example.com:","redirects":{"ott":"https://ott.example.com/"}}"#,
        );
        let config = ProvisioningConfig::load_from_file(&file.0).unwrap();
        assert_eq!(config.claim_namespace, "urn:example.com:");
        assert_eq!(config.redirects.ott, "https://ott.example.com/");
        assert_eq!(config.retention, IsoDuration::days(60));
    }

    #[test]
    fn loaded_file_is_validated() {
        let file = ScratchFile::new("invalid.toml", "[deletion]\nbatch_size = 0\n");
        let err = ProvisioningConfig::load_from_file(&file.0).unwrap_err();
        assert!(err.to_string().contains("deletionbatchsize"));
    }

    #[test]
    fn unsupported_file_extension_is_rejected() {
        let file = ScratchFile::new("config.yaml", "retention: P30D\n");
        let err = ProvisioningConfig::load_from_file(&file.0).unwrap_err();
        assert_matches!(err, ProvisionError::Config { .. });
        assert!(err.to_string().contains("Unsupported config file format"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let path = std::env::temp_dir().join(format!("provisio-{}-absent.toml", std::process::id()));
        let err = ProvisioningConfig::load_from_file(&path).unwrap_err();
        assert_matches!(err, ProvisionError::Config { .. });
    }
}
