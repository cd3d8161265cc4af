//! Shared harness for the behavioral specs.
//!
//! Builds an orchestrator over the in-memory store with scriptable
//! collaborators and a controllable clock, seeded with one verified
//! user, one active product, and one watch.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sw_core::{
    Alert, AlertData, AlertId, AlertKind, AlertLimits, AlertPriority, AlertRequest, Channel,
    FakeClock, FixedQuiet, Product, RecordingDispatcher, RetailerId, SequentialIdGen, User,
    UserId, Watch,
};
use sw_engine::AlertOrchestrator;
use sw_storage::{MemoryStore, Store};

pub type SpecOrchestrator =
    AlertOrchestrator<MemoryStore, RecordingDispatcher, FixedQuiet, FakeClock, SequentialIdGen>;

pub struct Harness {
    pub store: MemoryStore,
    pub dispatcher: RecordingDispatcher,
    pub quiet: FixedQuiet,
    pub clock: FakeClock,
    pub orchestrator: SpecOrchestrator,
}

/// A fixed, readable "now" for every spec
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).single().unwrap()
}

/// Harness with production-default limits (cap 50, dedup 15m, retry 3)
pub async fn harness() -> Harness {
    let store = MemoryStore::new();
    let dispatcher = RecordingDispatcher::new();
    let quiet = FixedQuiet::new();
    let clock = FakeClock::at(base_time());

    let user = User::new("u-1", "u1@example.com", base_time())
        .verified()
        .with_channels(vec![Channel::WebPush, Channel::Email]);
    store.put_user(&user).await.unwrap();
    let product = Product::new("p-1", "Widget Mark IV", base_time()).with_popularity(50);
    store.put_product(&product).await.unwrap();
    let watch = Watch::new("w-1", "u-1", "p-1", vec![RetailerId::from("r-1")], base_time());
    store.put_watch(&watch).await.unwrap();

    let orchestrator = AlertOrchestrator::new(
        store.clone(),
        dispatcher.clone(),
        quiet.clone(),
        clock.clone(),
        SequentialIdGen::new("alert"),
        AlertLimits::default(),
    );
    Harness {
        store,
        dispatcher,
        quiet,
        clock,
        orchestrator,
    }
}

/// A valid restock signal referencing the seeded user/product/watch
pub fn restock_request() -> AlertRequest {
    AlertRequest {
        user_id: UserId::from("u-1"),
        product_id: "p-1".into(),
        retailer_id: RetailerId::from("r-1"),
        kind: AlertKind::Restock,
        watch_id: Some("w-1".into()),
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

/// A bare alert row for seeding rate-limit scenarios
pub fn alert_row(id: &str, retailer: &str, created_at: DateTime<Utc>) -> Alert {
    let request = AlertRequest {
        retailer_id: RetailerId::from(retailer),
        watch_id: None,
        ..restock_request()
    };
    Alert::from_request(AlertId::from(id), &request, AlertPriority::High, created_at)
}
