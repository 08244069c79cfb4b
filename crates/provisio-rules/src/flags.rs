//! Account flag predicates and redirect policy
//!
//! Claim names are built from the configured claim namespace. The withdraw
//! date claims (`changeTime`, `auth_time`) are standard token claims and
//! live outside the namespace.

use chrono::{DateTime, Utc};
use provisio_core::config::{RedirectUrls, DEFAULT_CLAIM_NAMESPACE};
use provisio_core::{from_epoch_seconds, ClaimSet, ProvisionError, ProvisioningConfig, Result};

/// Claim carrying the RFC 3339 change time of the booking
pub const CHANGE_TIME_CLAIM: &str = "changeTime";
/// Claim carrying the authentication time in epoch seconds
pub const AUTH_TIME_CLAIM: &str = "auth_time";

/// ISO-8601 with a basic-format offset, e.g. `2021-11-18T08:11:09+0000`
const ISO8601_BASIC_OFFSET: &str = "%Y-%m-%dT%H:%M:%S%z";

const STATUS_OTT: &str = "1";
const STATUS_ACCESS: &str = "3";

/// Predicates over the product flags of a claim set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountFlags {
    booked: String,
    locked: String,
    preserve: String,
    status: String,
    main_email: String,
}

impl AccountFlags {
    /// Flags resolved in `namespace`
    pub fn in_namespace(namespace: &str) -> Self {
        Self {
            booked: format!("{namespace}f556"),
            locked: format!("{namespace}s556"),
            preserve: format!("{namespace}f734"),
            status: format!("{namespace}usta"),
            main_email: format!("{namespace}mainEmail"),
        }
    }

    /// Product is booked
    pub fn is_booked(&self, claims: &ClaimSet) -> bool {
        claims.flag(&self.booked)
    }

    /// Product is locked due to abuse
    pub fn is_locked(&self, claims: &ClaimSet) -> bool {
        claims.flag(&self.locked)
    }

    /// Customer is in the "preserve" process
    pub fn is_preserve_process(&self, claims: &ClaimSet) -> bool {
        claims.flag(&self.preserve)
    }

    /// Customer is an over-the-top customer
    pub fn is_ott_customer(&self, claims: &ClaimSet) -> bool {
        claims.is_set_to(&self.status, STATUS_OTT)
    }

    /// Customer is an access customer
    pub fn is_access_customer(&self, claims: &ClaimSet) -> bool {
        claims.is_set_to(&self.status, STATUS_ACCESS)
    }

    /// Primary e-mail address asserted by the provider
    pub fn main_email<'c>(&self, claims: &'c ClaimSet) -> Option<&'c str> {
        claims.get(&self.main_email).filter(|mail| !mail.trim().is_empty())
    }

    /// Withdraw date: `changeTime`, else `auth_time`, else `now`.
    ///
    /// `changeTime` may be RFC 3339 (`+00:00`, `Z`) or ISO-8601 with a
    /// basic offset (`+0000`). A present but unparsable value is an input
    /// error rather than a silent fallback.
    pub fn withdraw_date(&self, claims: &ClaimSet, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if let Some(change_time) = claims.get(CHANGE_TIME_CLAIM) {
            let text = change_time.trim();
            return DateTime::parse_from_rfc3339(text)
                .or_else(|_| DateTime::parse_from_str(text, ISO8601_BASIC_OFFSET))
                .map(|time| time.with_timezone(&Utc))
                .map_err(|e| {
                    ProvisionError::invalid_claims(format!(
                        "{CHANGE_TIME_CLAIM} '{change_time}' is not a timestamp: {e}"
                    ))
                });
        }
        if let Some(auth_time) = claims.get(AUTH_TIME_CLAIM) {
            let seconds = auth_time.trim().parse::<i64>().map_err(|_| {
                ProvisionError::invalid_claims(format!(
                    "{AUTH_TIME_CLAIM} '{auth_time}' is not epoch seconds"
                ))
            })?;
            return from_epoch_seconds(seconds);
        }
        Ok(now)
    }
}

impl Default for AccountFlags {
    fn default() -> Self {
        Self::in_namespace(DEFAULT_CLAIM_NAMESPACE)
    }
}

/// Why a withdrawn customer is redirected where they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectCause {
    /// "Preserve" process
    Preserve,
    /// Over-the-top customer
    Ott,
    /// Access customer
    Access,
    /// Anything else
    Withdraw,
}

/// Redirect URL selection for withdrawn and never-booked customers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    flags: AccountFlags,
    urls: RedirectUrls,
}

impl RedirectPolicy {
    /// Policy over `flags` with the given targets
    pub fn new(flags: AccountFlags, urls: RedirectUrls) -> Self {
        Self { flags, urls }
    }

    /// Build from configuration
    pub fn from_config(config: &ProvisioningConfig) -> Self {
        Self::new(
            AccountFlags::in_namespace(&config.claim_namespace),
            config.redirects.clone(),
        )
    }

    /// Cause selected for `claims`, in strict priority order.
    pub fn cause(&self, claims: &ClaimSet) -> RedirectCause {
        if self.flags.is_preserve_process(claims) {
            RedirectCause::Preserve
        } else if self.flags.is_ott_customer(claims) {
            RedirectCause::Ott
        } else if self.flags.is_access_customer(claims) {
            RedirectCause::Access
        } else {
            RedirectCause::Withdraw
        }
    }

    /// Target for a withdrawn account
    pub fn withdrawn_url(&self, claims: &ClaimSet) -> &str {
        match self.cause(claims) {
            RedirectCause::Preserve => &self.urls.preserve,
            RedirectCause::Ott => &self.urls.ott,
            RedirectCause::Access => &self.urls.access,
            RedirectCause::Withdraw => &self.urls.withdraw,
        }
    }

    /// Target for a customer without a tariff
    pub fn no_tariff_url(&self) -> &str {
        &self.urls.withdraw
    }
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::new(AccountFlags::default(), RedirectUrls::default())
    }
}
