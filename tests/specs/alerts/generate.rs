//! Generation specs: delivery, quiet-hour deferral, dedup, rate cap.

use crate::prelude::*;
use chrono::Duration as ChronoDuration;
use std::time::Duration;
use sw_core::{AlertStatus, Channel, UserId, WatchId};
use sw_engine::{GenerateError, GenerateOutcome};
use sw_storage::Store;

/// Scenario A: a restock for a verified user and active product,
/// outside quiet hours, with a fully succeeding dispatcher.
#[tokio::test]
async fn a_restock_outside_quiet_hours_delivers_on_both_channels() {
    let h = harness().await;

    let outcome = h.orchestrator.generate_alert(restock_request()).await.unwrap();

    let GenerateOutcome::Processed { alert_id, result } = &outcome else {
        panic!("expected Processed, got {outcome:?}");
    };
    assert!(result.success());
    assert_eq!(result.channels_used, vec![Channel::WebPush, Channel::Email]);

    let alert = h.store.get_alert(alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Sent);
    assert_eq!(alert.delivery_channels, vec![Channel::WebPush, Channel::Email]);

    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert_eq!(watch.alert_count, 1);
    assert_eq!(watch.last_alerted, Some(base_time()));
}

/// Scenario B: same signal, but the user is in quiet hours until T+3h.
#[tokio::test]
async fn quiet_hours_defer_to_the_next_active_time_and_leave_the_watch_alone() {
    let h = harness().await;
    let resume = base_time() + ChronoDuration::hours(3);
    h.quiet.quiet_until(resume);

    let outcome = h.orchestrator.generate_alert(restock_request()).await.unwrap();

    let GenerateOutcome::Scheduled {
        alert_id,
        scheduled_for,
    } = &outcome
    else {
        panic!("expected Scheduled, got {outcome:?}");
    };
    assert_eq!(*scheduled_for, resume);
    assert_eq!(outcome.status(), AlertStatus::Scheduled);

    let alert = h.store.get_alert(alert_id).await.unwrap().unwrap();
    assert_eq!(alert.scheduled_for, Some(resume));
    assert!(h.dispatcher.calls().is_empty());

    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert_eq!(watch.alert_count, 0);
    assert!(watch.last_alerted.is_none());
}

/// Scenario C: the same signal twice within five minutes folds into one.
#[tokio::test]
async fn a_duplicate_signal_within_the_window_references_the_original() {
    let h = harness().await;

    let first = h.orchestrator.generate_alert(restock_request()).await.unwrap();
    h.clock.advance(Duration::from_secs(5 * 60));
    let second = h.orchestrator.generate_alert(restock_request()).await.unwrap();

    assert_eq!(
        second,
        GenerateOutcome::Deduplicated {
            original: first.alert_id().clone()
        }
    );

    // Exactly one row exists for the key
    let rows = h
        .store
        .find_recent_alerts(
            &UserId::from("u-1"),
            &"p-1".into(),
            &"r-1".into(),
            sw_core::AlertKind::Restock,
            base_time() - ChronoDuration::hours(1),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    // The dedup invariant: no second delivery either
    assert_eq!(h.dispatcher.calls().len(), 1);
}

/// Scenario D: the 51st alert inside the hour is refused with no row.
#[tokio::test]
async fn the_hourly_cap_refuses_the_fifty_first_alert() {
    let h = harness().await;
    for i in 0..50 {
        h.store
            .insert_alert(&alert_row(
                &format!("seed-{i}"),
                &format!("seed-r-{i}"),
                base_time(),
            ))
            .await
            .unwrap();
    }

    let err = h
        .orchestrator
        .generate_alert(restock_request())
        .await
        .unwrap_err();
    assert!(
        matches!(err, GenerateError::RateLimited { count: 50, cap: 50 }),
        "got {err:?}"
    );
    assert!(err.to_string().contains("50"));

    // Zero rows created by the refusal
    assert_eq!(
        h.store
            .count_user_alerts_since(&UserId::from("u-1"), base_time() - ChronoDuration::hours(1))
            .await
            .unwrap(),
        50
    );
}

/// Validation failures report every violated rule and apply nothing.
#[tokio::test]
async fn an_invalid_signal_produces_no_alert_and_no_side_effect() {
    let h = harness().await;
    let mut bad = restock_request();
    bad.data.product_name.clear();
    bad.data.product_url = "javascript:alert(1)".to_string();

    let err = h.orchestrator.generate_alert(bad).await.unwrap_err();
    let GenerateError::Validation { violations } = err else {
        panic!("expected validation error");
    };
    assert_eq!(violations.len(), 2);

    assert!(h.dispatcher.calls().is_empty());
    assert_eq!(
        h.store
            .count_user_alerts_since(&UserId::from("u-1"), base_time() - ChronoDuration::hours(1))
            .await
            .unwrap(),
        0
    );
}
