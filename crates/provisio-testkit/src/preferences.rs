//! In-memory user preference store

use async_lock::RwLock;
use async_trait::async_trait;
use provisio_accounts::UserPreferences;
use provisio_core::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

type PreferenceKey = (String, String, String);

/// Preference store backed by a shared ordered map.
///
/// Iteration is ordered by user id, which gives the stable pagination the
/// deletion sweep expects.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: Arc<RwLock<BTreeMap<PreferenceKey, String>>>,
}

fn key(uid: &str, app: &str, name: &str) -> PreferenceKey {
    (uid.to_string(), app.to_string(), name.to_string())
}

impl MemoryPreferences {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values (for testing)
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    /// Check if the store is empty (for testing)
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All values of one user (for testing)
    pub async fn values_of(&self, uid: &str) -> BTreeMap<(String, String), String> {
        self.values
            .read()
            .await
            .iter()
            .filter(|((u, _, _), _)| u == uid)
            .map(|((_, app, name), value)| ((app.clone(), name.clone()), value.clone()))
            .collect()
    }
}

#[async_trait]
impl UserPreferences for MemoryPreferences {
    async fn get_user_value(&self, uid: &str, app: &str, name: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(&key(uid, app, name)).cloned())
    }

    async fn set_user_value(&self, uid: &str, app: &str, name: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key(uid, app, name), value.to_string());
        Ok(())
    }

    async fn delete_user_value(&self, uid: &str, app: &str, name: &str) -> Result<()> {
        self.values.write().await.remove(&key(uid, app, name));
        Ok(())
    }

    async fn delete_all_user_values(&self, uid: &str) -> Result<()> {
        self.values.write().await.retain(|(u, _, _), _| u != uid);
        Ok(())
    }

    async fn find_users_below(
        &self,
        app: &str,
        name: &str,
        bound: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        let values = self.values.read().await;
        Ok(values
            .iter()
            .filter(|((_, a, n), value)| {
                a == app && n == name && value.trim().parse::<i64>().is_ok_and(|v| v < bound)
            })
            .map(|((uid, _, _), _)| uid.clone())
            .skip(offset)
            .take(limit)
            .collect())
    }
}
