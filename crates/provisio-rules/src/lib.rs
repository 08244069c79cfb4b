//! Provisio Rules - pure claim rules
//!
//! Deterministic functions from a `ClaimSet` to derived account attributes:
//! the tariff catalog and quota derivation, displayname derivation, product
//! flag predicates and redirect selection. Nothing here performs I/O or holds
//! shared mutable state, so every rule is safe to call concurrently.

#![forbid(unsafe_code)]

pub mod displayname;
pub mod flags;
pub mod quota;
pub mod ruleset;
pub mod tariff;

pub use displayname::{DisplaynameRules, FieldGroup};
pub use flags::{AccountFlags, RedirectCause, RedirectPolicy};
pub use quota::QuotaRules;
pub use ruleset::RuleSet;
pub use tariff::{TariffCatalog, TariffTier};
