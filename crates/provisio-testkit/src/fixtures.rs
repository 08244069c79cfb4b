//! Claim fixtures modelled on real identity provider tokens

use provisio_accounts::{IdentityProvider, IdentityResolver};
use provisio_core::ClaimSet;

/// Claim namespace used by the fixtures
pub const NS: &str = "urn:telekom.com:";

/// Token claims of a booked customer with the FREE3 tariff.
pub const BOOKED_TOKEN: &str = r#"{
    "sub": "12004901000000000XXXXXXX",
    "iss": "https://telekom.example.com/",
    "aud": ["10TVL0SAM30000004901NEXTMAGENTACLOUDTEST"],
    "acr": "urn:telekom:names:idm:THO:1.0:ac:classes:passid:00",
    "auth_time": 1637683330,
    "exp": 1637686930,
    "iat": 1637683330,
    "nonce": "H6VXIR86HC6C4Z41F0N10V8OJ49INS0J",
    "urn:telekom.com:anid": "12004901000000000XXXXXXX",
    "urn:telekom.com:session_token": "b71ce9a1-4c76-11ec-a456-6919c2d53a81",
    "urn:telekom.com:email": "jonny.gyros@ver.sul.t-online.de",
    "urn:telekom.com:mainEmail": "jonny.gyros@ver.sul.t-online.de",
    "urn:telekom.com:displayname": "jonny.gyros@ver.sul.t-online.de",
    "urn:telekom.com:s556": "0",
    "urn:telekom.com:usta": "1",
    "urn:telekom.com:d556": "0",
    "urn:telekom.com:f556": "1",
    "urn:telekom.com:f734": "0",
    "urn:telekom.com:f048": "1",
    "urn:telekom.com:f049": "0",
    "urn:telekom.com:f051": "0",
    "urn:telekom.com:f460": "0",
    "urn:telekom.com:f467": "0",
    "urn:telekom.com:f468": "0",
    "urn:telekom.com:f469": "0",
    "urn:telekom.com:f471": "0"
}"#;

/// Claims of a booked, unlocked OTT customer
pub fn booked_claims() -> ClaimSet {
    ClaimSet::from_json_str(BOOKED_TOKEN).expect("fixture is a JSON object")
}

/// Booked claims with the product flag cleared
pub fn withdrawn_claims() -> ClaimSet {
    booked_claims().with_claim(ns("f556"), "0")
}

/// Booked claims with the abuse lock asserted
pub fn locked_claims() -> ClaimSet {
    booked_claims().with_claim(ns("s556"), "1")
}

/// Booked claims without any displayname source
pub fn anonymous_claims() -> ClaimSet {
    booked_claims()
        .without_claim(&ns("mainEmail"))
        .without_claim(&ns("displayname"))
}

/// Namespaced claim name
pub fn ns(suffix: &str) -> String {
    format!("{NS}{suffix}")
}

/// Claims carrying exactly the given namespaced flags set to `"1"`
pub fn flags(suffixes: &[&str]) -> ClaimSet {
    suffixes.iter().map(|s| (ns(s), "1".to_string())).collect()
}

/// Resolver knowing the single provider `1`/`Telekom`
pub fn telekom_resolver() -> IdentityResolver {
    IdentityResolver::new(vec![IdentityProvider::new("1", "Telekom")])
}
