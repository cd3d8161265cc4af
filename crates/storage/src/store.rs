// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store contract for alerts, watches, and collaborator records

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sw_core::{
    Alert, AlertId, AlertKind, PackSubscription, Product, ProductId, RetailerId, SubscriptionId,
    User, UserId, Watch, WatchId, WatchPack, WatchPackId,
};
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not found: {kind}/{id}")]
    NotFound { kind: &'static str, id: String },
}

/// Watch totals for health reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchCounts {
    pub total: u64,
    pub active: u64,
}

/// Pack totals for health reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackCounts {
    pub total: u64,
    pub active: u64,
}

/// Persistence boundary for the alert engine
///
/// Point lookups by id, the dedup-key scan ordered by creation time, a
/// trailing count per user, due/retryable listings, and an atomic watch
/// stat bump on the delivery success path. Implementations are safe to
/// share across concurrently running jobs and API calls.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    // ==================== Alerts ====================

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    async fn update_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    async fn get_alert(&self, id: &AlertId) -> Result<Option<Alert>, StoreError>;

    /// Alerts matching the dedup key created at or after `since`,
    /// newest first
    async fn find_recent_alerts(
        &self,
        user: &UserId,
        product: &ProductId,
        retailer: &RetailerId,
        kind: AlertKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<Alert>, StoreError>;

    /// Alerts created for this user at or after `since`
    async fn count_user_alerts_since(
        &self,
        user: &UserId,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Pending alerts due for delivery at `now`, oldest first
    async fn list_due_pending_alerts(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError>;

    /// Failed alerts still under the retry cap
    async fn list_retryable_alerts(&self, max_retries: u32) -> Result<Vec<Alert>, StoreError>;

    /// Remove settled (sent or failed) alerts created before `cutoff`;
    /// returns the number removed
    async fn prune_alerts_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    // ==================== Watches ====================

    async fn put_watch(&self, watch: &Watch) -> Result<(), StoreError>;

    async fn get_watch(&self, id: &WatchId) -> Result<Option<Watch>, StoreError>;

    async fn list_user_watches(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<Watch>, StoreError>;

    /// Page of active watches ordered by id
    async fn list_active_watches(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Watch>, StoreError>;

    async fn count_watches(&self) -> Result<WatchCounts, StoreError>;

    /// Soft-deactivate a watch; Ok(false) when it was already inactive
    /// or does not exist
    async fn deactivate_watch(&self, id: &WatchId, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Atomic alert-count bump on the delivery success path
    async fn record_watch_alert(&self, id: &WatchId, at: DateTime<Utc>) -> Result<(), StoreError>;

    // ==================== Packs and subscriptions ====================

    async fn put_pack(&self, pack: &WatchPack) -> Result<(), StoreError>;

    async fn get_pack(&self, id: &WatchPackId) -> Result<Option<WatchPack>, StoreError>;

    async fn count_packs(&self) -> Result<PackCounts, StoreError>;

    async fn put_subscription(&self, subscription: &PackSubscription) -> Result<(), StoreError>;

    async fn list_subscriptions(&self) -> Result<Vec<PackSubscription>, StoreError>;

    async fn count_active_subscriptions(&self, pack: &WatchPackId) -> Result<u64, StoreError>;

    /// Ok(false) when the subscription does not exist
    async fn remove_subscription(&self, id: &SubscriptionId) -> Result<bool, StoreError>;

    // ==================== Collaborator-owned records ====================

    async fn put_user(&self, user: &User) -> Result<(), StoreError>;

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    async fn put_product(&self, product: &Product) -> Result<(), StoreError>;

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError>;
}
