//! Health monitor specs: empty-system report, sampling, cleanup.

use crate::prelude::*;
use sw_core::{FakeClock, Product, RetailerId, UserId, Watch, WatchId};
use sw_engine::{CleanupOutcome, WatchHealthMonitor};
use sw_storage::{MemoryStore, Store};

fn monitor(store: &MemoryStore) -> WatchHealthMonitor<MemoryStore, FakeClock> {
    WatchHealthMonitor::new(store.clone(), FakeClock::at(base_time()))
}

/// Scenario F: zero watches produce an all-zero report, not an error.
#[tokio::test]
async fn system_health_over_nothing_is_all_zeros() {
    let store = MemoryStore::new();
    let health = monitor(&store).system_health(25).await.unwrap();

    assert_eq!(health.total_watches, 0);
    assert_eq!(health.active_watches, 0);
    assert_eq!(health.total_packs, 0);
    assert_eq!(health.active_packs, 0);
    assert_eq!(health.sample_size, 0);
    assert_eq!(health.estimated_healthy_watches, 0);
}

/// The system estimate is sampled, and says so.
#[tokio::test]
async fn the_system_estimate_is_scaled_from_a_sample() {
    let store = MemoryStore::new();
    let product = Product::new("p-1", "Widget", base_time());
    store.put_product(&product).await.unwrap();
    for i in 1..=20 {
        // Every fourth watch is broken (no retailers configured)
        let retailers = if i % 4 == 0 {
            vec![]
        } else {
            vec![RetailerId::from("r-1")]
        };
        store
            .put_watch(&Watch::new(
                format!("w-{i:02}"),
                "u-1",
                "p-1",
                retailers,
                base_time(),
            ))
            .await
            .unwrap();
    }

    let health = monitor(&store).system_health(8).await.unwrap();
    assert_eq!(health.active_watches, 20);
    assert_eq!(health.sample_size, 8);
    // w-01..w-08: w-04 and w-08 are broken
    assert_eq!(health.healthy_in_sample, 6);
    assert_eq!(health.estimated_healthy_watches, 15);
}

/// Cleanup is idempotent: the second immediate run changes nothing.
#[tokio::test]
async fn running_cleanup_twice_changes_nothing_the_second_time() {
    let h = harness().await;
    let dead = Product::new("p-dead", "Retired Widget", base_time()).inactive();
    h.store.put_product(&dead).await.unwrap();
    h.store
        .put_watch(&Watch::new(
            "w-dead",
            "u-1",
            "p-dead",
            vec![RetailerId::from("r-1")],
            base_time(),
        ))
        .await
        .unwrap();

    let health = WatchHealthMonitor::new(h.store.clone(), h.clock.clone());
    let first = health.cleanup_watches().await.unwrap();
    similar_asserts::assert_eq!(
        first,
        CleanupOutcome {
            watches_deactivated: 1,
            subscriptions_removed: 0,
        }
    );

    let second = health.cleanup_watches().await.unwrap();
    similar_asserts::assert_eq!(second, CleanupOutcome::default());

    // The healthy watch survived both passes
    let watch = h.store.get_watch(&WatchId::from("w-1")).await.unwrap().unwrap();
    assert!(watch.is_active);
    let watch = h.store.get_watch(&WatchId::from("w-dead")).await.unwrap().unwrap();
    assert!(!watch.is_active);
}

/// Per-user reports skip broken watches instead of failing wholesale.
#[tokio::test]
async fn a_user_report_lists_each_watch_with_its_issues() {
    let h = harness().await;
    h.store
        .put_watch(&Watch::new(
            "w-empty",
            "u-1",
            "p-1",
            vec![],
            base_time(),
        ))
        .await
        .unwrap();

    let health = WatchHealthMonitor::new(h.store.clone(), h.clock.clone());
    let reports = health
        .check_user_watches_health(&UserId::from("u-1"))
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    let by_id: Vec<(&str, bool)> = reports
        .iter()
        .map(|r| (r.watch_id.0.as_str(), r.is_healthy))
        .collect();
    similar_asserts::assert_eq!(by_id, vec![("w-1", true), ("w-empty", false)]);
}
