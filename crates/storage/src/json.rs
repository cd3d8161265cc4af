// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON file-based store
//!
//! One file per record under `<base>/<kind>/<id>.json`. Queries load the
//! relevant kind directory and filter in memory; writes that must be
//! atomic with respect to each other (the watch stat bump) serialize on
//! an internal write lock.

use crate::store::{PackCounts, Store, StoreError, WatchCounts};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use sw_core::{
    Alert, AlertId, AlertKind, AlertStatus, PackSubscription, Product, ProductId, RetailerId,
    SubscriptionId, User, UserId, Watch, WatchId, WatchPack, WatchPackId,
};

const ALERTS: &str = "alerts";
const WATCHES: &str = "watches";
const PACKS: &str = "packs";
const SUBSCRIPTIONS: &str = "subscriptions";
const USERS: &str = "users";
const PRODUCTS: &str = "products";

/// JSON file-based store
#[derive(Clone)]
pub struct JsonStore {
    base_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonStore {
    /// Open a store at the given path
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn path_for(&self, kind: &str, id: &str) -> PathBuf {
        self.base_path.join(kind).join(format!("{}.json", id))
    }

    fn save<T: Serialize>(&self, kind: &str, id: &str, data: &T) -> Result<(), StoreError> {
        let path = self.path_for(kind, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        fs::write(&path, json)?;
        Ok(())
    }

    fn load<T: DeserializeOwned>(&self, kind: &str, id: &str) -> Result<Option<T>, StoreError> {
        let path = self.path_for(kind, id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn load_all<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>, StoreError> {
        let dir = self.base_path.join(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let json = fs::read_to_string(&path)?;
                records.push(serde_json::from_str(&json)?);
            }
        }
        Ok(records)
    }

    fn delete(&self, kind: &str, id: &str) -> Result<bool, StoreError> {
        let path = self.path_for(kind, id);
        if path.exists() {
            fs::remove_file(&path)?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.save(ALERTS, &alert.id.0, alert)
    }

    async fn update_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        if !self.path_for(ALERTS, &alert.id.0).exists() {
            return Err(StoreError::NotFound {
                kind: "alert",
                id: alert.id.0.clone(),
            });
        }
        self.save(ALERTS, &alert.id.0, alert)
    }

    async fn get_alert(&self, id: &AlertId) -> Result<Option<Alert>, StoreError> {
        self.load(ALERTS, &id.0)
    }

    async fn find_recent_alerts(
        &self,
        user: &UserId,
        product: &ProductId,
        retailer: &RetailerId,
        kind: AlertKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<Alert>, StoreError> {
        let mut matches: Vec<Alert> = self
            .load_all::<Alert>(ALERTS)?
            .into_iter()
            .filter(|a| {
                a.user_id == *user
                    && a.product_id == *product
                    && a.retailer_id == *retailer
                    && a.kind == kind
                    && a.created_at >= since
            })
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }

    async fn count_user_alerts_since(
        &self,
        user: &UserId,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        Ok(self
            .load_all::<Alert>(ALERTS)?
            .iter()
            .filter(|a| a.user_id == *user && a.created_at >= since)
            .count() as u64)
    }

    async fn list_due_pending_alerts(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError> {
        let mut due: Vec<Alert> = self
            .load_all::<Alert>(ALERTS)?
            .into_iter()
            .filter(|a| a.status == AlertStatus::Pending && a.is_due(now))
            .collect();
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        due.truncate(limit);
        Ok(due)
    }

    async fn list_retryable_alerts(&self, max_retries: u32) -> Result<Vec<Alert>, StoreError> {
        let mut failed: Vec<Alert> = self
            .load_all::<Alert>(ALERTS)?
            .into_iter()
            .filter(|a| a.status == AlertStatus::Failed && a.retry_count < max_retries)
            .collect();
        failed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(failed)
    }

    async fn prune_alerts_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut removed = 0;
        for alert in self.load_all::<Alert>(ALERTS)? {
            if alert.status.is_settled() && alert.created_at < cutoff
                && self.delete(ALERTS, &alert.id.0)?
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn put_watch(&self, watch: &Watch) -> Result<(), StoreError> {
        self.save(WATCHES, &watch.id.0, watch)
    }

    async fn get_watch(&self, id: &WatchId) -> Result<Option<Watch>, StoreError> {
        self.load(WATCHES, &id.0)
    }

    async fn list_user_watches(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<Watch>, StoreError> {
        let mut watches: Vec<Watch> = self
            .load_all::<Watch>(WATCHES)?
            .into_iter()
            .filter(|w| w.user_id == *user)
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
        let mut watches: Vec<Watch> = self
            .load_all::<Watch>(WATCHES)?
            .into_iter()
            .filter(|w| w.is_active)
            .collect();
        watches.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(watches.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_watches(&self) -> Result<WatchCounts, StoreError> {
        let watches = self.load_all::<Watch>(WATCHES)?;
        Ok(WatchCounts {
            total: watches.len() as u64,
            active: watches.iter().filter(|w| w.is_active).count() as u64,
        })
    }

    async fn deactivate_watch(&self, id: &WatchId, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        match self.load::<Watch>(WATCHES, &id.0)? {
            Some(mut watch) if watch.is_active => {
                watch.deactivate(at);
                self.save(WATCHES, &id.0, &watch)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_watch_alert(&self, id: &WatchId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut watch =
            self.load::<Watch>(WATCHES, &id.0)?
                .ok_or_else(|| StoreError::NotFound {
                    kind: "watch",
                    id: id.0.clone(),
                })?;
        watch.record_alert(at);
        self.save(WATCHES, &id.0, &watch)
    }

    async fn put_pack(&self, pack: &WatchPack) -> Result<(), StoreError> {
        self.save(PACKS, &pack.id.0, pack)
    }

    async fn get_pack(&self, id: &WatchPackId) -> Result<Option<WatchPack>, StoreError> {
        self.load(PACKS, &id.0)
    }

    async fn count_packs(&self) -> Result<PackCounts, StoreError> {
        let packs = self.load_all::<WatchPack>(PACKS)?;
        Ok(PackCounts {
            total: packs.len() as u64,
            active: packs.iter().filter(|p| p.is_active).count() as u64,
        })
    }

    async fn put_subscription(&self, subscription: &PackSubscription) -> Result<(), StoreError> {
        self.save(SUBSCRIPTIONS, &subscription.id.0, subscription)
    }

    async fn list_subscriptions(&self) -> Result<Vec<PackSubscription>, StoreError> {
        let mut subscriptions = self.load_all::<PackSubscription>(SUBSCRIPTIONS)?;
        subscriptions.sort_by(|a: &PackSubscription, b| a.id.0.cmp(&b.id.0));
        Ok(subscriptions)
    }

    async fn count_active_subscriptions(&self, pack: &WatchPackId) -> Result<u64, StoreError> {
        Ok(self
            .load_all::<PackSubscription>(SUBSCRIPTIONS)?
            .iter()
            .filter(|s| s.pack_id == *pack && s.is_active)
            .count() as u64)
    }

    async fn remove_subscription(&self, id: &SubscriptionId) -> Result<bool, StoreError> {
        self.delete(SUBSCRIPTIONS, &id.0)
    }

    async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        self.save(USERS, &user.id.0, user)
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.load(USERS, &id.0)
    }

    async fn put_product(&self, product: &Product) -> Result<(), StoreError> {
        self.save(PRODUCTS, &product.id.0, product)
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        self.load(PRODUCTS, &id.0)
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
