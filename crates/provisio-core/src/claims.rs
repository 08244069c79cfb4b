//! Read-only claim sets
//!
//! A `ClaimSet` is the typed view over the bag of named values an identity
//! provider asserts about a customer. Lookups are by exact name, and a
//! missing claim is distinct from a claim carrying an empty value.

use crate::errors::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable mapping from claim name to claim value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet {
    claims: BTreeMap<String, String>,
}

impl ClaimSet {
    /// Create an empty claim set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a claim set from a JSON object as delivered by the identity provider.
    ///
    /// Strings are kept verbatim, booleans become `"1"`/`"0"`, numbers keep
    /// their decimal text and nested arrays/objects keep their compact JSON
    /// text. `null` values are treated as absent.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| ProvisionError::invalid_claims("claim set must be a JSON object"))?;

        let claims = object
            .iter()
            .filter_map(|(name, value)| {
                let text = match value {
                    serde_json::Value::Null => return None,
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Bool(true) => "1".to_string(),
                    serde_json::Value::Bool(false) => "0".to_string(),
                    serde_json::Value::Number(n) => n.to_string(),
                    other => other.to_string(),
                };
                Some((name.clone(), text))
            })
            .collect();

        Ok(Self { claims })
    }

    /// Parse a claim set from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ProvisionError::invalid_claims(format!("claims are not JSON: {e}")))?;
        Self::from_json_value(&value)
    }

    /// Return a copy of this set with one additional (or replaced) claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Return a copy of this set without the named claim.
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Whether a claim with this exact name is present.
    pub fn has(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    /// Value of the named claim, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(String::as_str)
    }

    /// Whether the named claim is present and equal to `expected`.
    pub fn is_set_to(&self, name: &str, expected: &str) -> bool {
        self.get(name) == Some(expected)
    }

    /// Whether the named flag claim is asserted (`"1"`).
    pub fn flag(&self, name: &str) -> bool {
        self.is_set_to(name, "1")
    }

    /// Number of claims in the set
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether the set carries no claims
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Iterate claims in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.claims.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for ClaimSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            claims: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_claim_differs_from_empty_claim() {
        let claims = ClaimSet::new().with_claim("urn:telekom.com:zusa", "");
        assert!(claims.has("urn:telekom.com:zusa"));
        assert_eq!(claims.get("urn:telekom.com:zusa"), Some(""));
        assert!(!claims.has("urn:telekom.com:name"));
        assert_eq!(claims.get("urn:telekom.com:name"), None);
    }

    #[test]
    fn lookups_are_exact() {
        let claims = ClaimSet::new().with_claim("urn:telekom.com:extmail", "a@b.de");
        assert!(!claims.has("urn:telekom.com:extMail"));
        assert!(!claims.has("extmail"));
    }

    #[test]
    fn json_scalars_are_normalised() {
        let claims = ClaimSet::from_json_str(
            r#"{"urn:telekom.com:f556":"1","auth_time":1637683330,"verified":true,
                "aud":["TEST"],"gone":null}"#,
        )
        .unwrap();

        assert!(claims.flag("urn:telekom.com:f556"));
        assert_eq!(claims.get("auth_time"), Some("1637683330"));
        assert_eq!(claims.get("verified"), Some("1"));
        assert_eq!(claims.get("aud"), Some(r#"["TEST"]"#));
        assert!(!claims.has("gone"));
    }

    #[test]
    fn non_object_json_is_rejected() {
        let err = ClaimSet::from_json_str("[1,2]").unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn flag_requires_exact_one() {
        let claims: ClaimSet = [("a", "1"), ("b", "0"), ("c", "true")].into_iter().collect();
        assert!(claims.flag("a"));
        assert!(!claims.flag("b"));
        assert!(!claims.flag("c"));
        assert!(!claims.flag("d"));
    }
}
