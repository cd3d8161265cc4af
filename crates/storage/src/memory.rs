// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store backed by shared maps
//!
//! Default store for tests and single-process deployments without a
//! state directory. All tables live behind one mutex; every operation
//! takes the lock once and clones records out.

use crate::store::{PackCounts, Store, StoreError, WatchCounts};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use sw_core::{
    Alert, AlertId, AlertKind, AlertStatus, PackSubscription, Product, ProductId, RetailerId,
    SubscriptionId, User, UserId, Watch, WatchId, WatchPack, WatchPackId,
};

#[derive(Default)]
struct Tables {
    alerts: HashMap<String, Alert>,
    watches: HashMap<String, Watch>,
    packs: HashMap<String, WatchPack>,
    subscriptions: HashMap<String, PackSubscription>,
    users: HashMap<String, User>,
    products: HashMap<String, Product>,
}

/// Shared-map store
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.lock().alerts.insert(alert.id.0.clone(), alert.clone());
        Ok(())
    }

    async fn update_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.alerts.contains_key(&alert.id.0) {
            return Err(StoreError::NotFound {
                kind: "alert",
                id: alert.id.0.clone(),
            });
        }
        tables.alerts.insert(alert.id.0.clone(), alert.clone());
        Ok(())
    }

    async fn get_alert(&self, id: &AlertId) -> Result<Option<Alert>, StoreError> {
        Ok(self.lock().alerts.get(&id.0).cloned())
    }

    async fn find_recent_alerts(
        &self,
        user: &UserId,
        product: &ProductId,
        retailer: &RetailerId,
        kind: AlertKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<Alert>, StoreError> {
        let tables = self.lock();
        let mut matches: Vec<Alert> = tables
            .alerts
            .values()
            .filter(|a| {
                a.user_id == *user
                    && a.product_id == *product
                    && a.retailer_id == *retailer
                    && a.kind == kind
                    && a.created_at >= since
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn count_user_alerts_since(
        &self,
        user: &UserId,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let tables = self.lock();
        Ok(tables
            .alerts
            .values()
            .filter(|a| a.user_id == *user && a.created_at >= since)
            .count() as u64)
    }

    async fn list_due_pending_alerts(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError> {
        let tables = self.lock();
        let mut due: Vec<Alert> = tables
            .alerts
            .values()
            .filter(|a| a.status == AlertStatus::Pending && a.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        due.truncate(limit);
        Ok(due)
    }

    async fn list_retryable_alerts(&self, max_retries: u32) -> Result<Vec<Alert>, StoreError> {
        let tables = self.lock();
        let mut failed: Vec<Alert> = tables
            .alerts
            .values()
            .filter(|a| a.status == AlertStatus::Failed && a.retry_count < max_retries)
            .cloned()
            .collect();
        failed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(failed)
    }

    async fn prune_alerts_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let before = tables.alerts.len();
        tables
            .alerts
            .retain(|_, a| !(a.status.is_settled() && a.created_at < cutoff));
        Ok((before - tables.alerts.len()) as u64)
    }

    async fn put_watch(&self, watch: &Watch) -> Result<(), StoreError> {
        self.lock().watches.insert(watch.id.0.clone(), watch.clone());
        Ok(())
    }

    async fn get_watch(&self, id: &WatchId) -> Result<Option<Watch>, StoreError> {
        Ok(self.lock().watches.get(&id.0).cloned())
    }

    async fn list_user_watches(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<Watch>, StoreError> {
        let tables = self.lock();
        let mut watches: Vec<Watch> = tables
            .watches
            .values()
            .filter(|w| w.user_id == *user)
            .cloned()
            .collect();
        watches.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        watches.truncate(limit);
        Ok(watches)
    }

    async fn list_active_watches(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Watch>, StoreError> {
        let tables = self.lock();
        let mut watches: Vec<Watch> = tables
            .watches
            .values()
            .filter(|w| w.is_active)
            .cloned()
            .collect();
        watches.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(watches.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_watches(&self) -> Result<WatchCounts, StoreError> {
        let tables = self.lock();
        let total = tables.watches.len() as u64;
        let active = tables.watches.values().filter(|w| w.is_active).count() as u64;
        Ok(WatchCounts { total, active })
    }

    async fn deactivate_watch(&self, id: &WatchId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut tables = self.lock();
        match tables.watches.get_mut(&id.0) {
            Some(watch) if watch.is_active => {
                watch.deactivate(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_watch_alert(&self, id: &WatchId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let watch = tables
            .watches
            .get_mut(&id.0)
            .ok_or_else(|| StoreError::NotFound {
                kind: "watch",
                id: id.0.clone(),
            })?;
        watch.record_alert(at);
        Ok(())
    }

    async fn put_pack(&self, pack: &WatchPack) -> Result<(), StoreError> {
        self.lock().packs.insert(pack.id.0.clone(), pack.clone());
        Ok(())
    }

    async fn get_pack(&self, id: &WatchPackId) -> Result<Option<WatchPack>, StoreError> {
        Ok(self.lock().packs.get(&id.0).cloned())
    }

    async fn count_packs(&self) -> Result<PackCounts, StoreError> {
        let tables = self.lock();
        let total = tables.packs.len() as u64;
        let active = tables.packs.values().filter(|p| p.is_active).count() as u64;
        Ok(PackCounts { total, active })
    }

    async fn put_subscription(&self, subscription: &PackSubscription) -> Result<(), StoreError> {
        self.lock()
            .subscriptions
            .insert(subscription.id.0.clone(), subscription.clone());
        Ok(())
    }

    async fn list_subscriptions(&self) -> Result<Vec<PackSubscription>, StoreError> {
        let tables = self.lock();
        let mut subscriptions: Vec<PackSubscription> =
            tables.subscriptions.values().cloned().collect();
        subscriptions.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(subscriptions)
    }

    async fn count_active_subscriptions(&self, pack: &WatchPackId) -> Result<u64, StoreError> {
        let tables = self.lock();
        Ok(tables
            .subscriptions
            .values()
            .filter(|s| s.pack_id == *pack && s.is_active)
            .count() as u64)
    }

    async fn remove_subscription(&self, id: &SubscriptionId) -> Result<bool, StoreError> {
        Ok(self.lock().subscriptions.remove(&id.0).is_some())
    }

    async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        self.lock().users.insert(user.id.0.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(&id.0).cloned())
    }

    async fn put_product(&self, product: &Product) -> Result<(), StoreError> {
        self.lock()
            .products
            .insert(product.id.0.clone(), product.clone());
        Ok(())
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.lock().products.get(&id.0).cloned())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
