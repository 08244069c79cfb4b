//! Displayname derivation
//!
//! Field groups are tried in order. The first group whose claims are all
//! present and whose joined value is non-empty wins. Group members are
//! claim-name suffixes resolved in the configured claim namespace.

use provisio_core::config::FieldGroupConfig;
use provisio_core::{ClaimSet, ProvisioningConfig};
use tracing::{debug, warn};

/// Built-in search order, most specific first.
///
/// Providers disagree on the spelling of the external mail claim, so both
/// variants are searched.
pub const DEFAULT_SEARCH: &[&[&str]] = &[
    &["zusa", "name"],
    &["extmail"],
    &["extMail"],
    &["mainEmail"],
    &["displayname"],
    &["name"],
];

/// One ordered group of claims joined with spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGroup {
    claims: Vec<String>,
    strip_mail_domain: bool,
}

impl FieldGroup {
    /// Group of `suffixes` resolved in `namespace`
    pub fn new<S: AsRef<str>>(namespace: &str, suffixes: &[S]) -> Self {
        Self {
            claims: suffixes
                .iter()
                .map(|suffix| format!("{namespace}{}", suffix.as_ref()))
                .collect(),
            strip_mail_domain: false,
        }
    }

    /// Cut values at the first `@`
    pub fn stripping_mail_domain(mut self) -> Self {
        self.strip_mail_domain = true;
        self
    }

    /// Fully qualified claim names of the group
    pub fn claims(&self) -> &[String] {
        &self.claims
    }

    fn resolve(&self, claims: &ClaimSet) -> Option<String> {
        let values = self
            .claims
            .iter()
            .map(|name| claims.get(name))
            .collect::<Option<Vec<_>>>()?;

        let joined = values
            .into_iter()
            .map(|value| {
                if self.strip_mail_domain {
                    value.split_once('@').map_or(value, |(local, _)| local)
                } else {
                    value
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Pure displayname rule.
#[derive(Debug, Clone)]
pub struct DisplaynameRules {
    groups: Vec<FieldGroup>,
}

impl DisplaynameRules {
    /// Rule over explicit field groups
    pub fn new(groups: Vec<FieldGroup>) -> Self {
        Self { groups }
    }

    /// Built-in search order in `namespace`
    pub fn builtin_in_namespace(namespace: &str) -> Self {
        Self::new(
            DEFAULT_SEARCH
                .iter()
                .map(|suffixes| FieldGroup::new(namespace, *suffixes))
                .collect(),
        )
    }

    /// Build from configuration; falls back to the built-in order.
    pub fn from_config(config: &ProvisioningConfig) -> Self {
        let namespace = config.claim_namespace.as_str();
        match &config.displayname_search {
            Some(groups) => Self::new(
                groups
                    .iter()
                    .map(|group| Self::group_from_config(namespace, group))
                    .collect(),
            ),
            None => Self::builtin_in_namespace(namespace),
        }
    }

    fn group_from_config(namespace: &str, config: &FieldGroupConfig) -> FieldGroup {
        let group = FieldGroup::new(namespace, config.fields());
        if config.strip_mail_domain() {
            group.stripping_mail_domain()
        } else {
            group
        }
    }

    /// Configured groups in search order
    pub fn groups(&self) -> &[FieldGroup] {
        &self.groups
    }

    /// Derive a displayname, `None` when no group resolves.
    pub fn derive_displayname(&self, claims: &ClaimSet) -> Option<String> {
        for (index, group) in self.groups.iter().enumerate() {
            if let Some(name) = group.resolve(claims) {
                debug!(group = index, "displayname derived");
                return Some(name);
            }
        }
        warn!(claims = claims.len(), "could not derive displayname from claims");
        None
    }
}

impl Default for DisplaynameRules {
    fn default() -> Self {
        Self::builtin_in_namespace(provisio_core::config::DEFAULT_CLAIM_NAMESPACE)
    }
}
