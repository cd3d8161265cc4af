//! Delivery and retry specs: failure recording, recovery, retry bound.

use crate::prelude::*;
use std::time::Duration;
use sw_core::{AlertStatus, Channel, Clock, WatchId};
use sw_engine::{GenerateOutcome, RetryOutcome};
use sw_storage::Store;

/// Scenario E: all channels fail, then a later retry succeeds.
#[tokio::test]
async fn a_failed_alert_transitions_to_sent_once_the_dispatcher_recovers() {
    let h = harness().await;
    h.dispatcher.fail_with("smtp 550");

    let outcome = h.orchestrator.generate_alert(restock_request()).await.unwrap();
    let GenerateOutcome::Failed { alert_id, result } = &outcome else {
        panic!("expected Failed, got {outcome:?}");
    };
    assert_eq!(result.failure_reason.as_deref(), Some("smtp 550"));

    let alert = h.store.get_alert(alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Failed);
    assert_eq!(alert.failure_reason.as_deref(), Some("smtp 550"));

    // The dispatcher comes back; the retry job picks the alert up
    h.dispatcher.succeed();
    h.clock.advance(Duration::from_secs(5 * 60));
    let retry = h.orchestrator.retry_failed_alerts().await.unwrap();
    assert_eq!(
        retry,
        RetryOutcome {
            attempted: 1,
            recovered: 1,
            exhausted: 0
        }
    );

    let alert = h.store.get_alert(alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Sent);
    assert_eq!(alert.delivery_channels, vec![Channel::WebPush, Channel::Email]);
    assert_eq!(alert.retry_count, 1);
}

/// Retry bound: MAX_RETRY_ATTEMPTS failures make the failure permanent.
#[tokio::test]
async fn an_alert_that_keeps_failing_is_permanently_failed_and_excluded() {
    let h = harness().await;
    h.dispatcher.fail_with("push endpoint gone");
    let outcome = h.orchestrator.generate_alert(restock_request()).await.unwrap();
    let alert_id = outcome.alert_id().clone();

    for _ in 0..3 {
        h.orchestrator.retry_failed_alerts().await.unwrap();
    }

    let alert = h.store.get_alert(&alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Failed);
    assert_eq!(alert.retry_count, 3);
    assert_eq!(
        alert.failure_reason.as_deref(),
        Some("max retry attempts exceeded")
    );

    // Even a healthy dispatcher cannot resurrect it
    h.dispatcher.succeed();
    let retry = h.orchestrator.retry_failed_alerts().await.unwrap();
    assert_eq!(retry, RetryOutcome::default());
    let alert = h.store.get_alert(&alert_id).await.unwrap().unwrap();
    assert_eq!(alert.status, AlertStatus::Failed);
}

/// Watch stats move exactly on successful delivery, never otherwise.
#[tokio::test]
async fn watch_stats_track_successful_deliveries_only() {
    let h = harness().await;

    // Failure: no movement
    h.dispatcher.fail_with("smtp 550");
    h.orchestrator.generate_alert(restock_request()).await.unwrap();
    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert_eq!((watch.alert_count, watch.last_alerted), (0, None));

    // Recovery through the retry pass: exactly one bump
    h.dispatcher.succeed();
    h.clock.advance(Duration::from_secs(60));
    h.orchestrator.retry_failed_alerts().await.unwrap();
    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert_eq!(watch.alert_count, 1);
    assert_eq!(watch.last_alerted, Some(h.clock.now()));

    // A dedup fold does not move stats either
    let second = h.orchestrator.generate_alert(restock_request()).await.unwrap();
    assert!(matches!(second, GenerateOutcome::Deduplicated { .. }));
    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert_eq!(watch.alert_count, 1);
}

/// A batch pass delivers everything due and reports its counts.
#[tokio::test]
async fn the_pending_pass_reports_batch_counts() {
    let h = harness().await;
    h.quiet.quiet_until(base_time() + chrono::Duration::minutes(30));
    for i in 0..3 {
        let mut request = restock_request();
        request.retailer_id = format!("r-{i}").into();
        request.watch_id = None;
        h.orchestrator.generate_alert(request).await.unwrap();
    }
    assert!(h.dispatcher.calls().is_empty());

    h.quiet.clear();
    h.clock.advance(Duration::from_secs(31 * 60));
    let batch = h.orchestrator.process_pending_alerts(10).await.unwrap();
    assert_eq!(
        (batch.processed, batch.failed, batch.rescheduled),
        (3, 0, 0)
    );
    assert_eq!(h.dispatcher.calls().len(), 3);
}
