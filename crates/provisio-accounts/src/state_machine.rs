//! Account lifecycle state machine
//!
//! One evaluation turns claims and derived attributes into a decision and
//! the directory mutations that go with it. The host serializes events per
//! user; no locking happens here.

use crate::decision::{AccountDecision, DecisionReason};
use crate::directory::{AccountDirectory, AccountLookup, AccountUpdate, NewAccount};
use crate::identity::IdentityResolver;
use provisio_core::{ClaimSet, HumanSize, ProvisioningConfig, Result, SystemTimeSource, TimeSource};
use provisio_rules::RuleSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Provider recorded for accounts created through [`AccountStateMachine::evaluate`]
pub const DEFAULT_PROVIDER: &str = "Telekom";

/// Account change notification delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountChangeEvent {
    /// Identity provider name or id
    pub provider: String,
    /// Username at the provider
    pub username: String,
    /// Claims asserted for the user
    pub claims: ClaimSet,
}

/// Drives directory mutations from claims.
pub struct AccountStateMachine<D: ?Sized> {
    directory: Arc<D>,
    rules: RuleSet,
    identity: IdentityResolver,
    clock: Arc<dyn TimeSource>,
    default_provider: String,
}

impl<D: AccountDirectory + ?Sized> AccountStateMachine<D> {
    /// State machine over `directory` with the given rules
    pub fn new(directory: Arc<D>, rules: RuleSet, identity: IdentityResolver) -> Self {
        Self {
            directory,
            rules,
            identity,
            clock: Arc::new(SystemTimeSource),
            default_provider: DEFAULT_PROVIDER.to_string(),
        }
    }

    /// Build every rule from configuration
    pub fn from_config(
        directory: Arc<D>,
        config: &ProvisioningConfig,
        identity: IdentityResolver,
    ) -> Result<Self> {
        Ok(Self::new(directory, RuleSet::from_config(config)?, identity))
    }

    /// Replace the clock used when claims carry no withdraw date
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Provider recorded for accounts created through `evaluate`
    pub fn with_default_provider(mut self, provider: impl Into<String>) -> Self {
        self.default_provider = provider.into();
        self
    }

    /// The claim rules
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The directory
    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Displayname for a claim-mapping event
    pub fn on_displayname_mapping(&self, claims: &ClaimSet) -> Option<String> {
        self.rules.displayname.derive_displayname(claims)
    }

    /// Quota for a claim-mapping event
    pub fn on_quota_mapping(&self, claims: &ClaimSet) -> HumanSize {
        self.rules.quota.derive_quota(claims).clone()
    }

    /// Evaluate claims for a directory user id.
    #[instrument(skip_all, fields(uid = %uid))]
    pub async fn evaluate(
        &self,
        uid: &str,
        claims: &ClaimSet,
        displayname: Option<&str>,
        quota: &HumanSize,
    ) -> Result<AccountDecision> {
        info!("checking account existence");
        let lookup = self.directory.find(uid).await?;
        let provider = self.default_provider.clone();
        self.decide(&provider, uid, lookup, claims, displayname, quota)
            .await
    }

    /// Resolve identity, derive attributes and evaluate.
    #[instrument(skip_all, fields(provider = %event.provider, username = %event.username))]
    pub async fn handle_change(&self, event: &AccountChangeEvent) -> Result<AccountDecision> {
        let (uid, lookup) = self
            .identity
            .find_account(self.directory.as_ref(), &event.provider, &event.username)
            .await?;
        let displayname = self.on_displayname_mapping(&event.claims);
        let quota = self.rules.quota.derive_quota(&event.claims);
        self.decide(
            &event.provider,
            &uid,
            lookup,
            &event.claims,
            displayname.as_deref(),
            quota,
        )
        .await
    }

    async fn decide(
        &self,
        provider: &str,
        uid: &str,
        lookup: AccountLookup,
        claims: &ClaimSet,
        displayname: Option<&str>,
        quota: &HumanSize,
    ) -> Result<AccountDecision> {
        let decision = match lookup {
            AccountLookup::NotFound => {
                self.new_account(provider, uid, claims, displayname, quota)
                    .await?
            }
            AccountLookup::Found(_) => {
                self.existing_account(uid, claims, displayname, quota)
                    .await?
            }
        };
        info!(
            uid = %uid,
            reason = %decision.reason,
            allowed = decision.allowed,
            changed = decision.changed,
            redirect = decision.redirect_url.as_deref().unwrap_or(""),
            "account decision"
        );
        Ok(decision)
    }

    async fn new_account(
        &self,
        provider: &str,
        uid: &str,
        claims: &ClaimSet,
        displayname: Option<&str>,
        quota: &HumanSize,
    ) -> Result<AccountDecision> {
        let Some(displayname) = displayname else {
            error!(uid = %uid, "new user without displayname");
            return Ok(AccountDecision::refuse(
                DecisionReason::NoDisplaynameNoNewAccount,
            ));
        };

        if self.rules.flags.is_locked(claims) {
            info!(uid = %uid, "new user with lock state, no user created");
            return Ok(AccountDecision::refuse(DecisionReason::LockedNoNewAccount));
        }

        if !self.rules.flags.is_booked(claims) {
            info!(uid = %uid, "new user without tariff, no user created");
            return Ok(AccountDecision::refuse(DecisionReason::NoTariffNoNewAccount)
                .with_redirect(self.rules.redirects.no_tariff_url()));
        }

        self.directory
            .create(NewAccount {
                provider: provider.to_string(),
                uid: uid.to_string(),
                display_name: displayname.to_string(),
                email: self.rules.flags.main_email(claims).map(str::to_string),
                quota: quota.clone(),
            })
            .await?;
        info!(uid = %uid, quota = %quota, "new user created");
        Ok(AccountDecision::allow(DecisionReason::Created))
    }

    async fn existing_account(
        &self,
        uid: &str,
        claims: &ClaimSet,
        displayname: Option<&str>,
        quota: &HumanSize,
    ) -> Result<AccountDecision> {
        let email = self.rules.flags.main_email(claims);

        if self.rules.flags.is_locked(claims) {
            self.directory
                .update(uid, AccountUpdate::refresh(displayname, email, quota, false))
                .await?;
            info!(uid = %uid, "user locked");
            return Ok(AccountDecision::refuse_changed(DecisionReason::Locked));
        }

        if self.rules.flags.is_booked(claims) {
            // claims saying "active" win over a pending deletion, even an expired one
            self.directory.unmark_deletion(uid).await?;
            match self.directory.deletion_deadline(uid).await? {
                None => info!(uid = %uid, "deletion mark removed"),
                Some(deadline) => {
                    error!(uid = %uid, deadline = %deadline, "deletion active after reactivation");
                }
            }
            self.directory
                .update(uid, AccountUpdate::refresh(displayname, email, quota, true))
                .await?;
            return Ok(AccountDecision::allow(DecisionReason::Updated));
        }

        let withdraw = self
            .rules
            .flags
            .withdraw_date(claims, self.clock.now())
            .map_err(|e| {
                warn!(uid = %uid, error = %e, "unusable withdraw date");
                e
            })?;
        let deadline = self.directory.mark_deletion(uid, withdraw).await?;
        info!(uid = %uid, withdrawn = %withdraw, deletion = %deadline, "user withdrawn");
        self.directory
            .update(uid, AccountUpdate::refresh(displayname, email, quota, false))
            .await?;

        Ok(AccountDecision::refuse_changed(DecisionReason::Withdrawn)
            .with_redirect(self.rules.redirects.withdrawn_url(claims)))
    }
}
