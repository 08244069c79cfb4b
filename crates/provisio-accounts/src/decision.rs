//! Account decisions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state an evaluation observed or produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountState {
    /// No account exists
    NotFound,
    /// Account exists and is enabled
    Active,
    /// Account is disabled due to abuse
    Locked,
    /// Account is disabled and scheduled for deletion
    Withdrawn,
}

/// Why an evaluation ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionReason {
    /// New account created
    Created,
    /// Existing account reactivated or refreshed
    Updated,
    /// Existing account locked
    Locked,
    /// Existing account withdrawn and scheduled for deletion
    Withdrawn,
    /// New account refused, no displayname derivable
    NoDisplaynameNoNewAccount,
    /// New account refused, product locked
    LockedNoNewAccount,
    /// New account refused, product not booked
    NoTariffNoNewAccount,
}

impl DecisionReason {
    /// Reason text reported to the host
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Locked => "Locked",
            Self::Withdrawn => "Withdrawn",
            Self::NoDisplaynameNoNewAccount => "No displayname no new account",
            Self::LockedNoNewAccount => "Locked no new account",
            Self::NoTariffNoNewAccount => "No tariff no new account",
        }
    }

    /// State the account is in after a decision with this reason
    pub fn resulting_state(&self) -> AccountState {
        match self {
            Self::Created | Self::Updated => AccountState::Active,
            Self::Locked => AccountState::Locked,
            Self::Withdrawn => AccountState::Withdrawn,
            Self::NoDisplaynameNoNewAccount
            | Self::LockedNoNewAccount
            | Self::NoTariffNoNewAccount => AccountState::NotFound,
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDecision {
    /// Whether the customer may use the account
    pub allowed: bool,
    /// Why
    pub reason: DecisionReason,
    /// Whether the directory was mutated
    pub changed: bool,
    /// Where to send a refused customer
    pub redirect_url: Option<String>,
}

impl AccountDecision {
    /// Allowed, directory changed
    pub fn allow(reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason,
            changed: true,
            redirect_url: None,
        }
    }

    /// Refused without touching the directory
    pub fn refuse(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
            changed: false,
            redirect_url: None,
        }
    }

    /// Refused after mutating the directory
    pub fn refuse_changed(reason: DecisionReason) -> Self {
        Self {
            changed: true,
            ..Self::refuse(reason)
        }
    }

    /// Attach a redirect target
    pub fn with_redirect(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// State the account is in afterwards
    pub fn state(&self) -> AccountState {
        self.reason.resulting_state()
    }
}
