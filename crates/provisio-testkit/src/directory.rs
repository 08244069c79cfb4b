//! In-memory account directory with failure injection
//!
//! Accounts live in a shared map; deletion deadlines go through a
//! `DeletionLedger` over [`MemoryPreferences`], the same layout a real host
//! keeps in its preference table.

use crate::preferences::MemoryPreferences;
use crate::time::ControllableTimeSource;
use async_lock::RwLock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use provisio_accounts::preferences::{DELETION_KEY, PROVISIONING_APP};
use provisio_accounts::{
    AccountDirectory, AccountLookup, AccountRecord, AccountUpdate, DeletionLedger, NewAccount,
    UserPreferences,
};
use provisio_core::{HumanSize, IsoDuration, ProvisionError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Faults {
    failing_deletes: BTreeSet<String>,
    slow_deletes: BTreeMap<String, Duration>,
    failing_writes: bool,
    delete_cost: Option<(ControllableTimeSource, i64)>,
}

/// Directory backed by in-memory maps.
#[derive(Debug, Clone)]
pub struct InMemoryDirectory {
    accounts: Arc<RwLock<BTreeMap<String, AccountRecord>>>,
    ledger: Arc<DeletionLedger<MemoryPreferences>>,
    faults: Arc<RwLock<Faults>>,
    creates: Arc<AtomicUsize>,
    updates: Arc<AtomicUsize>,
}

impl InMemoryDirectory {
    /// Empty directory applying `retention` to withdraw dates
    pub fn new(retention: IsoDuration) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(BTreeMap::new())),
            ledger: Arc::new(DeletionLedger::new(MemoryPreferences::new(), retention)),
            faults: Arc::new(RwLock::new(Faults::default())),
            creates: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The deletion ledger (for testing)
    pub fn ledger(&self) -> &DeletionLedger<MemoryPreferences> {
        &self.ledger
    }

    /// Insert an enabled account directly
    pub async fn seed(&self, uid: &str, display_name: &str, quota: &str) {
        let record = AccountRecord {
            uid: uid.to_string(),
            display_name: display_name.to_string(),
            primary_email: None,
            quota: HumanSize::parse(quota).unwrap(),
            enabled: true,
            deletion_deadline: None,
        };
        self.accounts.write().await.insert(uid.to_string(), record);
    }

    /// Insert an account already withdrawn with `deadline`
    pub async fn seed_withdrawn(&self, uid: &str, deadline: DateTime<Utc>) {
        self.seed(uid, uid, "3 GB").await;
        if let Some(record) = self.accounts.write().await.get_mut(uid) {
            record.enabled = false;
        }
        self.ledger
            .preferences()
            .set_user_value(
                uid,
                PROVISIONING_APP,
                DELETION_KEY,
                &deadline.timestamp().to_string(),
            )
            .await
            .unwrap();
    }

    /// Stored account (for testing)
    pub async fn account(&self, uid: &str) -> Option<AccountRecord> {
        self.accounts.read().await.get(uid).cloned()
    }

    /// Number of accounts (for testing)
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    /// Check if the directory is empty (for testing)
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of `create` calls that succeeded
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of `update` calls that succeeded
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Make every deletion of `uid` fail
    pub async fn fail_delete_of(&self, uid: &str) {
        self.faults
            .write()
            .await
            .failing_deletes
            .insert(uid.to_string());
    }

    /// Make every deletion of `uid` take `delay`
    pub async fn slow_delete_of(&self, uid: &str, delay: Duration) {
        self.faults
            .write()
            .await
            .slow_deletes
            .insert(uid.to_string(), delay);
    }

    /// Make create/update/mark calls fail like an unavailable backend
    pub async fn fail_writes(&self, failing: bool) {
        self.faults.write().await.failing_writes = failing;
    }

    /// Advance `clock` by `seconds` on every deletion
    pub async fn charge_deletes_to(&self, clock: ControllableTimeSource, seconds: i64) {
        self.faults.write().await.delete_cost = Some((clock, seconds));
    }

    async fn check_writable(&self) -> Result<()> {
        if self.faults.read().await.failing_writes {
            return Err(ProvisionError::directory("backend unavailable"));
        }
        Ok(())
    }

    async fn require(&self, uid: &str) -> Result<()> {
        if self.accounts.read().await.contains_key(uid) {
            Ok(())
        } else {
            Err(ProvisionError::unknown_account(format!("No user {uid}")))
        }
    }
}

#[async_trait]
impl AccountDirectory for InMemoryDirectory {
    async fn find(&self, uid: &str) -> Result<AccountLookup> {
        let Some(mut record) = self.account(uid).await else {
            return Ok(AccountLookup::NotFound);
        };
        record.deletion_deadline = self.ledger.deadline(uid).await?;
        Ok(AccountLookup::Found(record))
    }

    async fn create(&self, account: NewAccount) -> Result<AccountRecord> {
        self.check_writable().await?;
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.uid) {
            return Err(ProvisionError::directory(format!(
                "user {} already exists",
                account.uid
            )));
        }
        let record = AccountRecord {
            uid: account.uid.clone(),
            display_name: account.display_name,
            primary_email: account.email,
            quota: account.quota,
            enabled: true,
            deletion_deadline: None,
        };
        accounts.insert(account.uid, record.clone());
        drop(accounts);
        self.ledger.set_migrated(&record.uid, false).await?;
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn update(&self, uid: &str, update: AccountUpdate) -> Result<()> {
        self.check_writable().await?;
        let mut accounts = self.accounts.write().await;
        let record = accounts
            .get_mut(uid)
            .ok_or_else(|| ProvisionError::unknown_account(format!("No user {uid}")))?;
        update.apply_to(record);
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn mark_deletion(&self, uid: &str, withdraw: DateTime<Utc>) -> Result<DateTime<Utc>> {
        self.check_writable().await?;
        self.require(uid).await?;
        self.ledger.mark(uid, withdraw).await
    }

    async fn unmark_deletion(&self, uid: &str) -> Result<()> {
        self.check_writable().await?;
        self.ledger.unmark(uid).await
    }

    async fn deletion_deadline(&self, uid: &str) -> Result<Option<DateTime<Utc>>> {
        self.ledger.deadline(uid).await
    }

    async fn find_expired_deletions(
        &self,
        now: DateTime<Utc>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<String>> {
        self.ledger.find_expired(now, limit, offset).await
    }

    async fn delete(&self, uid: &str) -> Result<()> {
        let (failing, delay, cost) = {
            let faults = self.faults.read().await;
            (
                faults.failing_deletes.contains(uid),
                faults.slow_deletes.get(uid).copied(),
                faults.delete_cost.clone(),
            )
        };
        if let Some((clock, seconds)) = cost {
            clock.advance_time(seconds);
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(ProvisionError::directory(format!("cannot delete {uid}")));
        }
        self.accounts.write().await.remove(uid);
        self.ledger.forget(uid).await
    }
}
