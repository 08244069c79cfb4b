//! Account directory contract
//!
//! The directory owns account records and the persisted deletion deadline.
//! The lifecycle only reads records and requests mutations; it never edits a
//! cached copy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use provisio_core::{HumanSize, Result};
use serde::{Deserialize, Serialize};

/// Stored account as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Directory user id
    pub uid: String,
    /// Current display name
    pub display_name: String,
    /// Primary e-mail address
    pub primary_email: Option<String>,
    /// Granted quota
    pub quota: HumanSize,
    /// Whether the account may log in
    pub enabled: bool,
    /// Scheduled hard deletion, present only while withdrawn
    pub deletion_deadline: Option<DateTime<Utc>>,
}

/// Result of a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountLookup {
    /// Account exists
    Found(AccountRecord),
    /// No account under this id
    NotFound,
}

impl AccountLookup {
    /// The record, if found
    pub fn into_record(self) -> Option<AccountRecord> {
        match self {
            Self::Found(record) => Some(record),
            Self::NotFound => None,
        }
    }

    /// Whether an account was found
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl From<Option<AccountRecord>> for AccountLookup {
    fn from(record: Option<AccountRecord>) -> Self {
        record.map_or(Self::NotFound, Self::Found)
    }
}

/// Attributes of an account to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    /// Identity provider the account is bound to
    pub provider: String,
    /// Directory user id
    pub uid: String,
    /// Display name
    pub display_name: String,
    /// Primary e-mail address
    pub email: Option<String>,
    /// Granted quota
    pub quota: HumanSize,
}

/// Partial account update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// New display name
    pub display_name: Option<String>,
    /// New primary e-mail address
    pub email: Option<String>,
    /// New quota
    pub quota: Option<HumanSize>,
    /// Enable or disable login
    pub enabled: Option<bool>,
}

impl AccountUpdate {
    /// Refresh user data from derived attributes and set the enabled state.
    pub fn refresh(
        display_name: Option<&str>,
        email: Option<&str>,
        quota: &HumanSize,
        enabled: bool,
    ) -> Self {
        Self {
            display_name: display_name.map(str::to_string),
            email: email.map(str::to_string),
            quota: Some(quota.clone()),
            enabled: Some(enabled),
        }
    }

    /// Only toggle the enabled state
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.email.is_none()
            && self.quota.is_none()
            && self.enabled.is_none()
    }

    /// Apply to a record in place
    pub fn apply_to(&self, record: &mut AccountRecord) {
        if let Some(name) = &self.display_name {
            record.display_name.clone_from(name);
        }
        if let Some(email) = &self.email {
            record.primary_email = Some(email.clone());
        }
        if let Some(quota) = &self.quota {
            record.quota = quota.clone();
        }
        if let Some(enabled) = self.enabled {
            record.enabled = enabled;
        }
    }
}

/// Backing store for accounts and their deletion deadlines.
///
/// Every method may fail with a directory error. Implementations must make
/// the deadline read/write of a single account atomic.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Look up an account by directory user id
    async fn find(&self, uid: &str) -> Result<AccountLookup>;

    /// Create an account
    async fn create(&self, account: NewAccount) -> Result<AccountRecord>;

    /// Update an existing account; unknown ids are an input error
    async fn update(&self, uid: &str, update: AccountUpdate) -> Result<()>;

    /// Persist `withdraw + retention` as deletion deadline and return it
    async fn mark_deletion(&self, uid: &str, withdraw: DateTime<Utc>) -> Result<DateTime<Utc>>;

    /// Clear the deletion deadline; a no-op without one
    async fn unmark_deletion(&self, uid: &str) -> Result<()>;

    /// Currently persisted deletion deadline
    async fn deletion_deadline(&self, uid: &str) -> Result<Option<DateTime<Utc>>>;

    /// Ids whose deadline lies strictly before `now`, in a stable order
    async fn find_expired_deletions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>>;

    /// Permanently delete an account and its deadline
    async fn delete(&self, uid: &str) -> Result<()>;
}
