//! Per-user preference storage and the deletion ledger built on it
//!
//! Deadlines are stored as epoch seconds under `deletion` for the
//! provisioning app. The legacy `migrated` flag lives under the OIDC user
//! app.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use provisio_core::{from_epoch_seconds, IsoDuration, ProvisionError, Result};
use tracing::{debug, warn};

/// App id owning the deletion deadline
pub const PROVISIONING_APP: &str = "nmcprovisioning";
/// App id owning the legacy migration flag
pub const OIDC_USER_APP: &str = "nmcuser_oidc";
/// Preference key of the deletion deadline
pub const DELETION_KEY: &str = "deletion";
/// Preference key of the migration flag
pub const MIGRATED_KEY: &str = "migrated";

/// String-valued per-user key/value store.
#[async_trait]
pub trait UserPreferences: Send + Sync {
    /// Read a value
    async fn get_user_value(&self, uid: &str, app: &str, key: &str) -> Result<Option<String>>;

    /// Write a value
    async fn set_user_value(&self, uid: &str, app: &str, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing an absent value succeeds
    async fn delete_user_value(&self, uid: &str, app: &str, key: &str) -> Result<()>;

    /// Remove every value of a user
    async fn delete_all_user_values(&self, uid: &str) -> Result<()>;

    /// Users whose integer value under `app`/`key` is strictly below
    /// `bound`, ordered by user id, paginated by `limit`/`offset`.
    async fn find_users_below(
        &self,
        app: &str,
        key: &str,
        bound: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>>;
}

/// Deletion deadlines and migration flags over a preference store.
#[derive(Debug, Clone)]
pub struct DeletionLedger<P> {
    preferences: P,
    retention: IsoDuration,
}

impl<P: UserPreferences> DeletionLedger<P> {
    /// Ledger applying `retention` to withdraw dates
    pub fn new(preferences: P, retention: IsoDuration) -> Self {
        Self {
            preferences,
            retention,
        }
    }

    /// The retention period
    pub fn retention(&self) -> IsoDuration {
        self.retention
    }

    /// The preference store
    pub fn preferences(&self) -> &P {
        &self.preferences
    }

    /// Persist `withdraw + retention`, truncated to whole seconds, and return it.
    pub async fn mark(&self, uid: &str, withdraw: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let deadline = self.retention.add_to(withdraw)?.trunc_subsecs(0);
        self.preferences
            .set_user_value(
                uid,
                PROVISIONING_APP,
                DELETION_KEY,
                &deadline.timestamp().to_string(),
            )
            .await?;
        debug!(uid = %uid, deadline = %deadline, "deletion deadline stored");
        Ok(deadline)
    }

    /// Clear the deadline; idempotent.
    pub async fn unmark(&self, uid: &str) -> Result<()> {
        self.preferences
            .delete_user_value(uid, PROVISIONING_APP, DELETION_KEY)
            .await
    }

    /// Stored deadline, if any.
    pub async fn deadline(&self, uid: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self
            .preferences
            .get_user_value(uid, PROVISIONING_APP, DELETION_KEY)
            .await?
        else {
            return Ok(None);
        };
        let seconds = raw.trim().parse::<i64>().map_err(|_| {
            warn!(uid = %uid, value = %raw, "stored deletion deadline is not epoch seconds");
            ProvisionError::directory(format!("corrupt deletion deadline '{raw}' for {uid}"))
        })?;
        from_epoch_seconds(seconds)
            .map(Some)
            .map_err(|e| ProvisionError::directory(e.to_string()))
    }

    /// Users whose deadline lies strictly before `now`.
    ///
    /// Deadlines are whole seconds, so a fractional `now` also covers the
    /// deadline in its own second.
    pub async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        let bound = if now.timestamp_subsec_nanos() > 0 {
            now.timestamp().saturating_add(1)
        } else {
            now.timestamp()
        };
        self.preferences
            .find_users_below(PROVISIONING_APP, DELETION_KEY, bound, limit, offset)
            .await
    }

    /// Set the legacy migration flag
    pub async fn set_migrated(&self, uid: &str, migrated: bool) -> Result<()> {
        self.preferences
            .set_user_value(uid, OIDC_USER_APP, MIGRATED_KEY, if migrated { "1" } else { "0" })
            .await
    }

    /// Read the legacy migration flag; absent means not migrated
    pub async fn is_migrated(&self, uid: &str) -> Result<bool> {
        Ok(self
            .preferences
            .get_user_value(uid, OIDC_USER_APP, MIGRATED_KEY)
            .await?
            .is_some_and(|value| value == "1"))
    }

    /// Drop every preference of a deleted user
    pub async fn forget(&self, uid: &str) -> Result<()> {
        self.preferences.delete_all_user_values(uid).await
    }
}
