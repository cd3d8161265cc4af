// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Duration as ChronoDuration, TimeZone};
use std::time::Duration;
use sw_core::{
    AlertData, AlertKind, AlertPriority, FakeClock, FixedQuiet, RecordingDispatcher,
    RetailerId, SequentialIdGen, UserId,
};
use sw_storage::MemoryStore;

type TestOrchestrator =
    AlertOrchestrator<MemoryStore, RecordingDispatcher, FixedQuiet, FakeClock, SequentialIdGen>;

struct Harness {
    store: MemoryStore,
    dispatcher: RecordingDispatcher,
    quiet: FixedQuiet,
    clock: FakeClock,
    orchestrator: TestOrchestrator,
}

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).single().unwrap()
}

async fn harness() -> Harness {
    harness_with_limits(AlertLimits::for_testing()).await
}

async fn harness_with_limits(limits: AlertLimits) -> Harness {
    let store = MemoryStore::new();
    let dispatcher = RecordingDispatcher::new();
    let quiet = FixedQuiet::new();
    let clock = FakeClock::at(base());

    let user = User::new("u-1", "u1@example.com", base())
        .verified()
        .with_channels(vec![Channel::WebPush, Channel::Email]);
    store.put_user(&user).await.unwrap();
    let product = Product::new("p-1", "Widget Mark IV", base()).with_popularity(50);
    store.put_product(&product).await.unwrap();
    let watch = Watch::new("w-1", "u-1", "p-1", vec![RetailerId::from("r-1")], base());
    store.put_watch(&watch).await.unwrap();

    let orchestrator = AlertOrchestrator::new(
        store.clone(),
        dispatcher.clone(),
        quiet.clone(),
        clock.clone(),
        SequentialIdGen::new("alert"),
        limits,
    );
    Harness {
        store,
        dispatcher,
        quiet,
        clock,
        orchestrator,
    }
}

fn request() -> AlertRequest {
    AlertRequest {
        user_id: UserId::from("u-1"),
        product_id: "p-1".into(),
        retailer_id: RetailerId::from("r-1"),
        kind: AlertKind::Restock,
        watch_id: Some(WatchId::from("w-1")),
        priority: None,
        data: AlertData {
            product_name: "Widget Mark IV".to_string(),
            retailer_name: "MegaMart".to_string(),
            product_url: "https://megamart.example/widget-iv".to_string(),
            price_cents: Some(4_999),
            ..AlertData::default()
        },
    }
}

// ==================== Validation ====================

#[tokio::test]
async fn validation_aggregates_every_violation_and_creates_nothing() {
    let h = harness().await;
    let bad = AlertRequest {
        user_id: UserId::from(""),
        retailer_id: RetailerId::from(""),
        data: AlertData::default(),
        watch_id: None,
        ..request()
    };

    let err = h.orchestrator.generate_alert(bad).await.unwrap_err();
    let GenerateError::Validation { violations } = err else {
        panic!("expected validation error");
    };
    // empty user id, empty retailer id, three payload rules, and the
    // user lookup cannot succeed for an empty id
    assert!(violations.len() >= 5, "violations: {violations:?}");
    assert!(violations.iter().any(|v| v.contains("user id")));
    assert!(violations.iter().any(|v| v.contains("retailer id")));
    assert!(violations.iter().any(|v| v.contains("product name")));

    assert_eq!(
        h.store
            .count_user_alerts_since(&UserId::from("u-1"), base() - ChronoDuration::hours(1))
            .await
            .unwrap(),
        0
    );
    assert!(h.dispatcher.calls().is_empty());
}

#[tokio::test]
async fn unverified_users_are_rejected() {
    let h = harness().await;
    let user = User::new("u-2", "u2@example.com", base());
    h.store.put_user(&user).await.unwrap();

    let err = h
        .orchestrator
        .generate_alert(AlertRequest {
            user_id: UserId::from("u-2"),
            watch_id: None,
            ..request()
        })
        .await
        .unwrap_err();
    let GenerateError::Validation { violations } = err else {
        panic!("expected validation error");
    };
    assert_eq!(violations, vec!["user email is not verified".to_string()]);
}

#[tokio::test]
async fn inactive_products_are_rejected() {
    let h = harness().await;
    let product = Product::new("p-dead", "Retired Widget", base()).inactive();
    h.store.put_product(&product).await.unwrap();

    let err = h
        .orchestrator
        .generate_alert(AlertRequest {
            product_id: "p-dead".into(),
            watch_id: None,
            ..request()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::Validation { violations }
        if violations == vec!["product is not active".to_string()]));
}

#[tokio::test]
async fn foreign_and_inactive_watches_are_rejected() {
    let h = harness().await;
    let other = User::new("u-2", "u2@example.com", base()).verified();
    h.store.put_user(&other).await.unwrap();
    let mut foreign = Watch::new("w-2", "u-2", "p-1", vec![RetailerId::from("r-1")], base());
    foreign.deactivate(base());
    h.store.put_watch(&foreign).await.unwrap();

    let err = h
        .orchestrator
        .generate_alert(AlertRequest {
            watch_id: Some(WatchId::from("w-2")),
            ..request()
        })
        .await
        .unwrap_err();
    let GenerateError::Validation { violations } = err else {
        panic!("expected validation error");
    };
    assert!(violations.contains(&"watch is not active".to_string()));
    assert!(violations.contains(&"watch belongs to a different user".to_string()));
}

#[tokio::test]
async fn missing_watch_is_rejected() {
    let h = harness().await;
    let err = h
        .orchestrator
        .generate_alert(AlertRequest {
            watch_id: Some(WatchId::from("w-404")),
            ..request()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::Validation { violations }
        if violations == vec!["watch not found: w-404".to_string()]));
}

// ==================== Happy path ====================

#[tokio::test]
async fn generated_alert_is_delivered_and_watch_stats_move() {
    let h = harness().await;
    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();

    let GenerateOutcome::Processed { alert_id, result } = &outcome else {
        panic!("expected Processed, got {outcome:?}");
    };
    assert_eq!(outcome.status(), AlertStatus::Sent);
    assert_eq!(
        result.channels_used,
        vec![Channel::WebPush, Channel::Email]
    );

    let alert = h.store.get_alert(alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Sent);
    assert_eq!(alert.delivery_channels, vec![Channel::WebPush, Channel::Email]);
    // Restock of a mid-popularity product computes High
    assert_eq!(alert.priority, AlertPriority::High);

    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert_eq!(watch.alert_count, 1);
    assert_eq!(watch.last_alerted, Some(base()));
}

#[tokio::test]
async fn explicit_priority_wins_over_the_strategy() {
    let h = harness().await;
    let outcome = h
        .orchestrator
        .generate_alert(AlertRequest {
            priority: Some(AlertPriority::Low),
            ..request()
        })
        .await
        .unwrap();

    let alert = h.store.get_alert(outcome.alert_id()).await.unwrap().unwrap();
    assert_eq!(alert.priority, AlertPriority::Low);
}

// ==================== Dedup ====================

#[tokio::test]
async fn a_second_signal_in_the_window_deduplicates() {
    let h = harness().await;
    let first = h.orchestrator.generate_alert(request()).await.unwrap();

    h.clock.advance(Duration::from_secs(5 * 60));
    let second = h.orchestrator.generate_alert(request()).await.unwrap();

    assert_eq!(
        second,
        GenerateOutcome::Deduplicated {
            original: first.alert_id().clone()
        }
    );
    assert_eq!(second.status(), AlertStatus::Deduplicated);
    // No second row, no second delivery
    assert_eq!(h.dispatcher.calls().len(), 1);
    assert_eq!(
        h.store
            .count_user_alerts_since(&UserId::from("u-1"), base() - ChronoDuration::hours(1))
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn signals_outside_the_window_alert_again() {
    let h = harness().await;
    h.orchestrator.generate_alert(request()).await.unwrap();

    h.clock.advance(Duration::from_secs(16 * 60));
    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();
    assert!(matches!(outcome, GenerateOutcome::Processed { .. }));
    assert_eq!(h.dispatcher.calls().len(), 2);
}

// ==================== Rate limiting ====================

#[tokio::test]
async fn the_cap_refuses_creation_with_count_and_cap() {
    let h = harness().await; // cap is 5 in testing limits
    for i in 0..5 {
        h.orchestrator
            .generate_alert(AlertRequest {
                retailer_id: RetailerId::from(format!("r-{i}").as_str()),
                watch_id: None,
                ..request()
            })
            .await
            .unwrap();
    }

    let err = h
        .orchestrator
        .generate_alert(AlertRequest {
            retailer_id: RetailerId::from("r-fresh"),
            watch_id: None,
            ..request()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::RateLimited { count: 5, cap: 5 }));

    // Refusal created no row
    assert_eq!(
        h.store
            .count_user_alerts_since(&UserId::from("u-1"), base() - ChronoDuration::hours(1))
            .await
            .unwrap(),
        5
    );
}

// ==================== Quiet hours ====================

#[tokio::test]
async fn quiet_hours_defer_delivery_without_touching_the_watch() {
    let h = harness().await;
    let resume = base() + ChronoDuration::hours(3);
    h.quiet.quiet_until(resume);

    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();
    let GenerateOutcome::Scheduled {
        alert_id,
        scheduled_for,
    } = &outcome
    else {
        panic!("expected Scheduled, got {outcome:?}");
    };
    assert_eq!(*scheduled_for, resume);
    assert_eq!(outcome.status(), AlertStatus::Scheduled);

    // Deferred, not abandoned: the row stays pending with the deferral
    let alert = h.store.get_alert(alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Pending);
    assert_eq!(alert.scheduled_for, Some(resume));

    assert!(h.dispatcher.calls().is_empty());
    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert_eq!(watch.alert_count, 0);
    assert!(watch.last_alerted.is_none());
}

#[tokio::test]
async fn quiet_without_a_next_active_time_falls_back_an_hour() {
    let h = harness().await;
    h.quiet.set(sw_core::QuietDecision::quiet("weekend mode"));

    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();
    let GenerateOutcome::Scheduled { scheduled_for, .. } = outcome else {
        panic!("expected Scheduled");
    };
    assert_eq!(scheduled_for, base() + ChronoDuration::hours(1));
}

#[tokio::test]
async fn a_deferred_alert_still_suppresses_duplicates() {
    let h = harness().await;
    h.quiet.quiet_until(base() + ChronoDuration::hours(3));
    let first = h.orchestrator.generate_alert(request()).await.unwrap();

    let second = h.orchestrator.generate_alert(request()).await.unwrap();
    assert_eq!(
        second,
        GenerateOutcome::Deduplicated {
            original: first.alert_id().clone()
        }
    );
}

#[tokio::test]
async fn pending_pass_delivers_once_quiet_hours_end() {
    let h = harness().await;
    h.quiet.quiet_until(base() + ChronoDuration::hours(3));
    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();

    // Still quiet at the deferred time: rescheduled again, not dropped
    h.clock.advance(Duration::from_secs(3 * 3600));
    h.quiet.quiet_until(h.clock.now() + ChronoDuration::hours(1));
    let batch = h.orchestrator.process_pending_alerts(10).await.unwrap();
    assert_eq!(batch.rescheduled, 1);
    assert_eq!(batch.processed, 0);

    // Quiet over: delivery goes through and stats move
    h.clock.advance(Duration::from_secs(3600));
    h.quiet.clear();
    let batch = h.orchestrator.process_pending_alerts(10).await.unwrap();
    assert_eq!(batch.processed, 1);

    let alert = h.store.get_alert(outcome.alert_id()).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Sent);
    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert_eq!(watch.alert_count, 1);
}

// ==================== Delivery failures ====================

#[tokio::test]
async fn dispatcher_failure_marks_the_alert_failed_and_leaves_the_watch_alone() {
    let h = harness().await;
    h.dispatcher.fail_with("smtp 550");

    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();
    let GenerateOutcome::Failed { alert_id, result } = &outcome else {
        panic!("expected Failed, got {outcome:?}");
    };
    assert_eq!(result.failure_reason.as_deref(), Some("smtp 550"));

    let alert = h.store.get_alert(alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Failed);
    assert_eq!(alert.failure_reason.as_deref(), Some("smtp 550"));

    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert_eq!(watch.alert_count, 0);
}

#[tokio::test]
async fn partial_success_records_the_successful_subset() {
    let h = harness().await;
    h.dispatcher.push_outcome(DeliveryOutcome::partial(
        vec![Channel::WebPush],
        vec![Channel::Email],
        Some("smtp 421".to_string()),
    ));

    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();
    let GenerateOutcome::Processed { alert_id, result } = &outcome else {
        panic!("expected Processed");
    };
    assert_eq!(result.channels_used, vec![Channel::WebPush]);

    let alert = h.store.get_alert(alert_id).await.unwrap().unwrap();
    assert_eq!(alert.delivery_channels, vec![Channel::WebPush]);
}

#[tokio::test]
async fn a_user_without_channels_fails_with_a_reason() {
    let h = harness().await;
    let user = User::new("u-1", "u1@example.com", base()).verified();
    h.store.put_user(&user).await.unwrap();

    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();
    let GenerateOutcome::Failed { result, .. } = outcome else {
        panic!("expected Failed");
    };
    assert_eq!(
        result.failure_reason.as_deref(),
        Some("no delivery channels available")
    );
    assert!(h.dispatcher.calls().is_empty());
}

#[tokio::test]
async fn a_user_missing_at_processing_time_fails_cleanly() {
    let h = harness().await;
    h.quiet.quiet_until(base() + ChronoDuration::hours(1));
    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();
    let alert_id = outcome.alert_id().clone();

    // The account disappears while the alert waits out quiet hours;
    // a store that only holds the alert models the missing user
    let store = MemoryStore::new();
    store
        .insert_alert(&h.store.get_alert(&alert_id).await.unwrap().unwrap())
        .await
        .unwrap();
    let orchestrator = AlertOrchestrator::new(
        store.clone(),
        h.dispatcher.clone(),
        FixedQuiet::new(),
        h.clock.clone(),
        SequentialIdGen::new("alert"),
        AlertLimits::for_testing(),
    );
    h.clock.advance(Duration::from_secs(3600));

    let result = orchestrator.process_alert(&alert_id).await.unwrap();
    assert_eq!(result.failure_reason.as_deref(), Some("user not found"));
    let alert = store.get_alert(&alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Failed);
}

#[tokio::test]
async fn processing_a_missing_alert_is_a_typed_error() {
    let h = harness().await;
    let err = h
        .orchestrator
        .process_alert(&AlertId::from("a-404"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::NotFound { kind: "alert", .. }));
}

// ==================== Batch processing ====================

#[tokio::test]
async fn one_bad_alert_does_not_abort_the_batch() {
    let h = harness().await;
    h.quiet.quiet_until(base() + ChronoDuration::minutes(10));
    for i in 0..3 {
        h.orchestrator
            .generate_alert(AlertRequest {
                retailer_id: RetailerId::from(format!("r-{i}").as_str()),
                watch_id: None,
                ..request()
            })
            .await
            .unwrap();
    }
    h.quiet.clear();
    h.clock.advance(Duration::from_secs(11 * 60));

    // Middle alert will fail: its user vanishes from channel prefs
    h.dispatcher.push_outcome(DeliveryOutcome::delivered(vec![Channel::WebPush]));
    h.dispatcher.push_outcome(DeliveryOutcome::failed(
        vec![Channel::WebPush],
        "push endpoint gone",
    ));

    let batch = h.orchestrator.process_pending_alerts(10).await.unwrap();
    assert_eq!(batch.processed, 2);
    assert_eq!(batch.failed, 1);
    assert_eq!(batch.rescheduled, 0);
}

#[tokio::test]
async fn the_batch_respects_its_limit() {
    let h = harness().await;
    h.quiet.quiet_until(base() + ChronoDuration::minutes(10));
    for i in 0..4 {
        h.orchestrator
            .generate_alert(AlertRequest {
                retailer_id: RetailerId::from(format!("r-{i}").as_str()),
                watch_id: None,
                ..request()
            })
            .await
            .unwrap();
    }
    h.quiet.clear();
    h.clock.advance(Duration::from_secs(11 * 60));

    let batch = h.orchestrator.process_pending_alerts(2).await.unwrap();
    assert_eq!(batch.processed, 2);
    let batch = h.orchestrator.process_pending_alerts(10).await.unwrap();
    assert_eq!(batch.processed, 2);
}

// ==================== Retries ====================

#[tokio::test]
async fn a_failed_alert_recovers_on_retry() {
    let h = harness().await;
    h.dispatcher.fail_with("smtp 550");
    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();
    let alert_id = outcome.alert_id().clone();

    h.dispatcher.succeed();
    let retry = h.orchestrator.retry_failed_alerts().await.unwrap();
    assert_eq!(
        retry,
        RetryOutcome {
            attempted: 1,
            recovered: 1,
            exhausted: 0
        }
    );

    let alert = h.store.get_alert(&alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Sent);
    assert_eq!(alert.retry_count, 1);
    // Recovery counts as the success path: watch stats move now
    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert_eq!(watch.alert_count, 1);
}

#[tokio::test]
async fn every_attempt_counts_and_exhaustion_is_permanent() {
    let h = harness().await;
    h.dispatcher.fail_with("push endpoint gone");
    let outcome = h.orchestrator.generate_alert(request()).await.unwrap();
    let alert_id = outcome.alert_id().clone();

    // max_retry_attempts is 3: two passes still fail, third exhausts
    for expected_count in 1..=2u32 {
        let retry = h.orchestrator.retry_failed_alerts().await.unwrap();
        assert_eq!(retry.attempted, 1);
        assert_eq!(retry.recovered, 0);
        let alert = h.store.get_alert(&alert_id).await.unwrap().unwrap();
        assert_eq!(alert.retry_count, expected_count);
    }

    let retry = h.orchestrator.retry_failed_alerts().await.unwrap();
    assert_eq!(retry.attempted, 1);
    assert_eq!(retry.exhausted, 1);

    let alert = h.store.get_alert(&alert_id).await.unwrap().unwrap();
    assert_eq!(alert.retry_count, 3);
    assert_eq!(
        alert.failure_reason.as_deref(),
        Some("max retry attempts exceeded")
    );

    // Excluded from later passes even with a healthy dispatcher
    h.dispatcher.succeed();
    let retry = h.orchestrator.retry_failed_alerts().await.unwrap();
    assert_eq!(retry, RetryOutcome::default());
    let alert = h.store.get_alert(&alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Failed);
}
