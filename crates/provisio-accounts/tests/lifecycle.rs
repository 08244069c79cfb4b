//! Account lifecycle against the in-memory directory

#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, Utc};
use provisio_accounts::{
    AccountChangeEvent, AccountDirectory, AccountState, AccountStateMachine, DecisionReason,
    IdentityResolver,
};
use provisio_core::config::{DEFAULT_CUSTOMER_URL, DEFAULT_WITHDRAW_URL};
use provisio_core::{from_epoch_seconds, HumanSize, IsoDuration, ProvisionError, ProvisioningConfig};
use provisio_rules::RuleSet;
use provisio_testkit::fixtures::{self, ns};
use provisio_testkit::{init_test_tracing, ControllableTimeSource, InMemoryDirectory};
use std::sync::Arc;

const GB: u64 = 1024 * 1024 * 1024;

struct Harness {
    directory: InMemoryDirectory,
    clock: ControllableTimeSource,
    machine: AccountStateMachine<InMemoryDirectory>,
}

fn harness() -> Harness {
    init_test_tracing();
    let directory = InMemoryDirectory::new(IsoDuration::days(60));
    let clock = ControllableTimeSource::at("2022-03-01T12:00:00Z");
    let machine = AccountStateMachine::new(
        Arc::new(directory.clone()),
        RuleSet::default(),
        fixtures::telekom_resolver(),
    )
    .with_clock(clock.shared());
    Harness {
        directory,
        clock,
        machine,
    }
}

fn ts(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .unwrap()
        .with_timezone(&Utc)
}

fn gb(n: u64) -> HumanSize {
    HumanSize::from_bytes(n * GB)
}

#[tokio::test]
async fn booked_customer_gets_created() {
    let h = harness();
    let claims = fixtures::booked_claims();

    let decision = h
        .machine
        .evaluate("u1", &claims, Some("Jonny Gyros"), &gb(3))
        .await
        .unwrap();

    assert!(decision.allowed);
    assert!(decision.changed);
    assert_eq!(decision.reason, DecisionReason::Created);
    assert_eq!(decision.state(), AccountState::Active);
    let record = h.directory.account("u1").await.unwrap();
    assert_eq!(record.display_name, "Jonny Gyros");
    assert_eq!(
        record.primary_email.as_deref(),
        Some("jonny.gyros@ver.sul.t-online.de")
    );
    assert_eq!(record.quota.bytes(), 3 * GB);
    assert!(!h.directory.ledger().is_migrated("u1").await.unwrap());
}

#[tokio::test]
async fn new_customer_without_tariff_is_sent_to_the_tariff_page() {
    let h = harness();
    let claims = fixtures::withdrawn_claims();

    let decision = h
        .machine
        .evaluate("u1", &claims, Some("Jonny"), &gb(3))
        .await
        .unwrap();

    assert!(!decision.allowed);
    assert!(!decision.changed);
    assert_eq!(decision.reason, DecisionReason::NoTariffNoNewAccount);
    assert_eq!(decision.redirect_url.as_deref(), Some(DEFAULT_WITHDRAW_URL));
    assert_eq!(h.directory.create_count(), 0);
}

#[tokio::test]
async fn new_customer_refusals_leave_directory_untouched() {
    let h = harness();

    let locked = h
        .machine
        .evaluate("u1", &fixtures::locked_claims(), Some("Jonny"), &gb(3))
        .await
        .unwrap();
    assert_eq!(locked.reason, DecisionReason::LockedNoNewAccount);
    assert_eq!(locked.redirect_url, None);

    let nameless = h
        .machine
        .evaluate("u1", &fixtures::booked_claims(), None, &gb(3))
        .await
        .unwrap();
    assert_eq!(nameless.reason, DecisionReason::NoDisplaynameNoNewAccount);
    assert_eq!(nameless.state(), AccountState::NotFound);

    assert!(h.directory.is_empty().await);
}

#[tokio::test]
async fn booked_existing_account_is_refreshed() {
    let h = harness();
    h.directory.seed("u1", "Old Name", "3 GB").await;
    let claims = fixtures::booked_claims().with_claim(ns("f467"), "1");

    let decision = h
        .machine
        .evaluate("u1", &claims, Some("New Name"), &gb(25))
        .await
        .unwrap();

    assert_eq!(decision.reason, DecisionReason::Updated);
    assert!(decision.allowed);
    let record = h.directory.account("u1").await.unwrap();
    assert_eq!(record.display_name, "New Name");
    assert_eq!(record.quota.bytes(), 25 * GB);
    assert!(record.enabled);
}

#[tokio::test]
async fn locked_existing_account_is_disabled_without_deadline() {
    let h = harness();
    h.directory.seed("u1", "Jonny", "3 GB").await;

    let decision = h
        .machine
        .evaluate("u1", &fixtures::locked_claims(), Some("Jonny"), &gb(3))
        .await
        .unwrap();

    assert_eq!(decision.reason, DecisionReason::Locked);
    assert!(!decision.allowed);
    assert!(decision.changed);
    assert!(!h.directory.account("u1").await.unwrap().enabled);
    assert_eq!(h.directory.deletion_deadline("u1").await.unwrap(), None);
}

#[tokio::test]
async fn withdrawn_ott_customer_is_scheduled_for_deletion() {
    let h = harness();
    h.directory.seed("u1", "Jonny", "3 GB").await;

    let decision = h
        .machine
        .evaluate("u1", &fixtures::withdrawn_claims(), Some("Jonny"), &gb(3))
        .await
        .unwrap();

    assert_eq!(decision.reason, DecisionReason::Withdrawn);
    assert_eq!(decision.state(), AccountState::Withdrawn);
    assert_eq!(decision.redirect_url.as_deref(), Some(DEFAULT_CUSTOMER_URL));
    assert!(!h.directory.account("u1").await.unwrap().enabled);

    // no changeTime in the token, so auth_time is the withdraw date
    let auth_time = from_epoch_seconds(1_637_683_330).unwrap();
    assert_eq!(
        h.directory.deletion_deadline("u1").await.unwrap(),
        Some(auth_time + Duration::days(60))
    );
}

#[tokio::test]
async fn change_time_wins_over_auth_time() {
    let h = harness();
    h.directory.seed("u1", "Jonny", "3 GB").await;
    let claims = fixtures::withdrawn_claims().with_claim("changeTime", "2021-11-18T08:11:09Z");

    h.machine
        .evaluate("u1", &claims, Some("Jonny"), &gb(3))
        .await
        .unwrap();

    assert_eq!(
        h.directory.deletion_deadline("u1").await.unwrap(),
        Some(ts("2022-01-17T08:11:09Z"))
    );
}

#[tokio::test]
async fn basic_offset_change_time_withdraws_the_account() {
    let h = harness();
    h.directory.seed("u1", "Jonny", "3 GB").await;
    let claims =
        fixtures::withdrawn_claims().with_claim("changeTime", "2021-11-18T08:11:09+0000");

    let decision = h
        .machine
        .evaluate("u1", &claims, Some("Jonny"), &gb(3))
        .await
        .unwrap();

    assert_eq!(decision.reason, DecisionReason::Withdrawn);
    assert!(!h.directory.account("u1").await.unwrap().enabled);
    assert_eq!(
        h.directory.deletion_deadline("u1").await.unwrap(),
        Some(ts("2022-01-17T08:11:09Z"))
    );
}

#[tokio::test]
async fn missing_withdraw_claims_fall_back_to_the_clock() {
    let h = harness();
    h.directory.seed("u1", "Jonny", "3 GB").await;
    let claims = fixtures::withdrawn_claims().without_claim("auth_time");

    h.machine
        .evaluate("u1", &claims, Some("Jonny"), &gb(3))
        .await
        .unwrap();

    assert_eq!(
        h.directory.deletion_deadline("u1").await.unwrap(),
        Some(h.clock.current() + Duration::days(60))
    );
}

#[tokio::test]
async fn malformed_change_time_is_an_input_error() {
    let h = harness();
    h.directory.seed("u1", "Jonny", "3 GB").await;
    let claims = fixtures::withdrawn_claims().with_claim("changeTime", "last tuesday");

    let err = h
        .machine
        .evaluate("u1", &claims, Some("Jonny"), &gb(3))
        .await
        .unwrap_err();

    assert_matches!(err, ProvisionError::InvalidClaims { .. });
    assert_eq!(h.directory.deletion_deadline("u1").await.unwrap(), None);
}

#[tokio::test]
async fn redirect_follows_the_withdraw_cause() {
    init_test_tracing();
    let mut config = ProvisioningConfig::default();
    config.redirects.preserve = "https://preserve.example.com/".to_string();
    config.redirects.ott = "https://ott.example.com/".to_string();
    config.redirects.access = "https://access.example.com/".to_string();
    let directory = InMemoryDirectory::new(IsoDuration::days(60));
    let machine = AccountStateMachine::from_config(
        Arc::new(directory.clone()),
        &config,
        fixtures::telekom_resolver(),
    )
    .unwrap();

    let cases = [
        (
            fixtures::withdrawn_claims().with_claim(ns("f734"), "1"),
            "https://preserve.example.com/",
        ),
        (fixtures::withdrawn_claims(), "https://ott.example.com/"),
        (
            fixtures::withdrawn_claims().with_claim(ns("usta"), "3"),
            "https://access.example.com/",
        ),
        (
            fixtures::withdrawn_claims().with_claim(ns("usta"), "0"),
            DEFAULT_WITHDRAW_URL,
        ),
    ];
    for (uid, (claims, expected)) in cases.iter().enumerate() {
        let uid = format!("u{uid}");
        directory.seed(&uid, "Jonny", "3 GB").await;
        let decision = machine
            .evaluate(&uid, claims, Some("Jonny"), &gb(3))
            .await
            .unwrap();
        assert_eq!(decision.reason, DecisionReason::Withdrawn);
        assert_eq!(decision.redirect_url.as_deref(), Some(*expected));
    }
}

#[tokio::test]
async fn rebooking_clears_an_expired_deadline() {
    let h = harness();
    h.directory
        .seed_withdrawn("u1", ts("2022-01-17T08:11:09Z"))
        .await;
    assert!(h.directory.deletion_deadline("u1").await.unwrap().unwrap() < h.clock.current());

    let decision = h
        .machine
        .evaluate("u1", &fixtures::booked_claims(), Some("Jonny"), &gb(3))
        .await
        .unwrap();

    assert_eq!(decision.reason, DecisionReason::Updated);
    assert_eq!(h.directory.deletion_deadline("u1").await.unwrap(), None);
    assert!(h.directory.account("u1").await.unwrap().enabled);
}

#[tokio::test]
async fn withdraw_then_rebook_round_trip() {
    let h = harness();
    h.directory.seed("u1", "Jonny", "3 GB").await;

    h.machine
        .evaluate("u1", &fixtures::withdrawn_claims(), Some("Jonny"), &gb(3))
        .await
        .unwrap();
    assert!(h.directory.deletion_deadline("u1").await.unwrap().is_some());

    h.machine
        .evaluate("u1", &fixtures::booked_claims(), Some("Jonny"), &gb(3))
        .await
        .unwrap();
    assert_eq!(h.directory.deletion_deadline("u1").await.unwrap(), None);

    // unmarking an unmarked account is harmless
    h.directory.unmark_deletion("u1").await.unwrap();
    assert_eq!(h.directory.deletion_deadline("u1").await.unwrap(), None);
}

#[tokio::test]
async fn directory_failure_propagates() {
    let h = harness();
    h.directory.fail_writes(true).await;

    let err = h
        .machine
        .evaluate("u1", &fixtures::booked_claims(), Some("Jonny"), &gb(3))
        .await
        .unwrap_err();

    assert_matches!(err, ProvisionError::Directory { .. });
    assert!(!err.is_input_error());
}

#[tokio::test]
async fn change_event_derives_attributes_from_claims() {
    let h = harness();
    let event = AccountChangeEvent {
        provider: "Telekom".to_string(),
        username: "120049010000000007210207".to_string(),
        claims: fixtures::booked_claims(),
    };

    let decision = h.machine.handle_change(&event).await.unwrap();

    assert_eq!(decision.reason, DecisionReason::Created);
    let record = h
        .directory
        .account("120049010000000007210207")
        .await
        .unwrap();
    assert_eq!(record.display_name, "jonny.gyros@ver.sul.t-online.de");
    assert_eq!(record.quota.bytes(), 3 * GB);
}

#[tokio::test]
async fn long_usernames_are_hashed() {
    let h = harness();
    let username = "x".repeat(80);
    let event = AccountChangeEvent {
        provider: "1".to_string(),
        username: username.clone(),
        claims: fixtures::booked_claims(),
    };

    h.machine.handle_change(&event).await.unwrap();

    let uid = IdentityResolver::compute_user_id(&username);
    assert_eq!(uid.len(), 64);
    assert!(h.directory.account(&uid).await.is_some());
    assert!(h.directory.account(&username).await.is_none());
}

#[tokio::test]
async fn accounts_stored_under_the_raw_username_are_still_found() {
    let h = harness();
    let username = "y".repeat(70);
    h.directory.seed(&username, "Legacy", "25 GB").await;
    let event = AccountChangeEvent {
        provider: "Telekom".to_string(),
        username: username.clone(),
        claims: fixtures::booked_claims(),
    };

    let decision = h.machine.handle_change(&event).await.unwrap();

    assert_eq!(decision.reason, DecisionReason::Updated);
    assert_eq!(h.directory.create_count(), 0);
    assert_eq!(h.directory.len().await, 1);
}

#[tokio::test]
async fn unknown_provider_is_rejected() {
    let h = harness();
    let event = AccountChangeEvent {
        provider: "Nobody".to_string(),
        username: "u1".to_string(),
        claims: fixtures::booked_claims(),
    };

    let err = h.machine.handle_change(&event).await.unwrap_err();

    assert_matches!(err, ProvisionError::UnknownProvider { .. });
    assert!(h.directory.is_empty().await);
}

#[tokio::test]
async fn change_event_without_displayname_source_is_refused() {
    let h = harness();
    let event = AccountChangeEvent {
        provider: "Telekom".to_string(),
        username: "u1".to_string(),
        claims: fixtures::anonymous_claims(),
    };

    let decision = h.machine.handle_change(&event).await.unwrap();

    assert_eq!(decision.reason, DecisionReason::NoDisplaynameNoNewAccount);
}
