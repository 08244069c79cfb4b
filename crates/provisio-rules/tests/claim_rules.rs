//! Rules evaluated over identity provider claim documents.

#![allow(clippy::expect_used, missing_docs)]

use provisio_core::config::ProvisioConfig;
use provisio_core::{ClaimSet, ProvisioningConfig};
use provisio_rules::RuleSet;
use std::collections::HashMap;

const SLUP_CLAIMS: &str = r#"{
    "iss": "https://accounts.login00.idm.ver.sul.t-online.de",
    "urn:telekom.com:anid": "120049010000000007210207",
    "urn:telekom.com:d556": "0",
    "urn:telekom.com:f048": "1",
    "urn:telekom.com:f049": "1",
    "urn:telekom.com:f460": "0",
    "urn:telekom.com:f467": "0",
    "urn:telekom.com:f468": "0",
    "urn:telekom.com:f469": "0",
    "urn:telekom.com:f471": "0",
    "urn:telekom.com:f556": "1",
    "urn:telekom.com:f734": "0",
    "urn:telekom.com:mainEmail": "nmc-test-user@ver.sul.t-online.de",
    "urn:telekom.com:s556": "0",
    "urn:telekom.com:usta": "1",
    "urn:telekom.com:zusa": "Nmc",
    "urn:telekom.com:name": "Testuser",
    "auth_time": 1637683330
}"#;

fn slup_claims() -> ClaimSet {
    ClaimSet::from_json_str(SLUP_CLAIMS).expect("fixture is valid JSON")
}

#[test]
fn default_rules_over_slup_document() {
    let rules = RuleSet::default();
    let claims = slup_claims();

    assert_eq!(rules.quota.derive_quota(&claims).label(), "15 GB");
    assert_eq!(
        rules.displayname.derive_displayname(&claims).as_deref(),
        Some("Nmc Testuser")
    );
    assert!(rules.flags.is_booked(&claims));
    assert!(rules.flags.is_ott_customer(&claims));
    assert_eq!(
        rules.flags.main_email(&claims),
        Some("nmc-test-user@ver.sul.t-online.de")
    );
}

#[test]
fn host_overrides_flow_into_every_rule() {
    let source: HashMap<String, String> = [
        ("userotturl", "https://ott.example.org/"),
        ("displaynamesearch", r#"[{"fields":["mainEmail"],"strip_mail_domain":true}]"#),
        ("tariffs", r#"[{"key":"BIG","size":"2 TB","flag":"urn:telekom.com:f049"}]"#),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let config = ProvisioningConfig::from_source(&source).expect("valid overrides");
    let rules = RuleSet::from_config(&config).expect("valid tariff table");
    let claims = slup_claims().with_claim("urn:telekom.com:f556", "0");

    assert_eq!(rules.quota.derive_quota(&claims).label(), "2 TB");
    assert_eq!(
        rules.displayname.derive_displayname(&claims).as_deref(),
        Some("nmc-test-user")
    );
    assert_eq!(
        rules.redirects.withdrawn_url(&claims),
        "https://ott.example.org/"
    );
}

#[test]
fn invalid_tariff_table_is_fatal() {
    let mut config = ProvisioningConfig::default();
    config.tariffs = Some(
        serde_json::from_str(r#"[{"key":"A","size":"1 GB"},{"key":"B","size":"2 GB"}]"#)
            .expect("valid JSON"),
    );
    assert!(RuleSet::from_config(&config).is_err());
}
