//! Identity provider and user id resolution

use crate::directory::{AccountDirectory, AccountLookup};
use provisio_core::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Usernames longer than this are replaced by their SHA-256 digest.
pub const MAX_PLAIN_USER_ID_LEN: usize = 64;

/// A registered identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProvider {
    /// Stable provider id
    pub id: String,
    /// Human-facing identifier, matched case-insensitively
    pub identifier: String,
}

impl IdentityProvider {
    /// Provider with `id` known as `identifier`
    pub fn new(id: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            identifier: identifier.into(),
        }
    }
}

/// Maps provider names and usernames onto directory accounts.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    providers: Vec<IdentityProvider>,
}

impl IdentityResolver {
    /// Resolver over the registered providers
    pub fn new(providers: Vec<IdentityProvider>) -> Self {
        Self { providers }
    }

    /// Registered providers
    pub fn providers(&self) -> &[IdentityProvider] {
        &self.providers
    }

    /// Provider id for `name`: identifier case-insensitively, or id exactly.
    pub fn resolve_provider(&self, name: &str) -> Result<&str> {
        self.providers
            .iter()
            .find(|p| p.identifier.eq_ignore_ascii_case(name) || p.id == name)
            .map(|p| p.id.as_str())
            .ok_or_else(|| ProvisionError::unknown_provider(format!("No oidc provider {name}")))
    }

    /// Directory user id for a provider username.
    pub fn compute_user_id(username: &str) -> String {
        if username.len() > MAX_PLAIN_USER_ID_LEN {
            hex::encode(Sha256::digest(username.as_bytes()))
        } else {
            username.to_string()
        }
    }

    /// Look the account up by computed id first, then by raw username.
    ///
    /// Returns the computed user id alongside the lookup so callers can
    /// create the account under it.
    pub async fn find_account<D>(
        &self,
        directory: &D,
        provider: &str,
        username: &str,
    ) -> Result<(String, AccountLookup)>
    where
        D: AccountDirectory + ?Sized,
    {
        let provider_id = self.resolve_provider(provider)?;
        let uid = Self::compute_user_id(username);

        if let AccountLookup::Found(record) = directory.find(&uid).await? {
            debug!(provider = provider_id, uid = %uid, "account found by computed id");
            return Ok((uid, AccountLookup::Found(record)));
        }
        if uid != username {
            if let Some(record) = directory.find(username).await?.into_record() {
                debug!(provider = provider_id, uid = %record.uid, "account found by username");
                return Ok((record.uid.clone(), AccountLookup::Found(record)));
            }
        }
        Ok((uid, AccountLookup::NotFound))
    }
}
