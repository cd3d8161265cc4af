// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deduplication gate and per-key serialization
//!
//! Equivalent alerts inside the dedup window fold into the original:
//! at most one live (pending or sent) alert per (user, product,
//! retailer, kind) per window. A plain read-then-insert leaves a race
//! between concurrent generate calls for the same key, so the generate
//! path holds a per-key async lock across the check and the insert.

use crate::to_chrono;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use sw_core::{AlertId, AlertKind, AlertRequest, AlertStatus, ProductId, RetailerId, UserId};
use sw_storage::{Store, StoreError};

/// The identity an alert deduplicates on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub retailer_id: RetailerId,
    pub kind: AlertKind,
}

impl DedupKey {
    pub fn from_request(request: &AlertRequest) -> Self {
        Self {
            user_id: request.user_id.clone(),
            product_id: request.product_id.clone(),
            retailer_id: request.retailer_id.clone(),
            kind: request.kind,
        }
    }

    /// Stable string form used to key the generate-path lock
    pub fn lock_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.user_id, self.product_id, self.retailer_id, self.kind
        )
    }
}

/// Finds an existing live alert for a dedup key inside the window
pub struct DedupGate<S: Store> {
    store: S,
    window: Duration,
}

impl<S: Store> DedupGate<S> {
    pub fn new(store: S, window: Duration) -> Self {
        Self { store, window }
    }

    /// The original alert this key folds into, if one exists
    ///
    /// Only pending and sent alerts suppress duplicates; a failed alert
    /// does not stop a fresh signal from alerting.
    pub async fn find_existing(
        &self,
        key: &DedupKey,
        now: DateTime<Utc>,
    ) -> Result<Option<AlertId>, StoreError> {
        let since = now - to_chrono(self.window);
        let recent = self
            .store
            .find_recent_alerts(
                &key.user_id,
                &key.product_id,
                &key.retailer_id,
                key.kind,
                since,
            )
            .await?;
        Ok(recent
            .into_iter()
            .find(|a| matches!(a.status, AlertStatus::Pending | AlertStatus::Sent))
            .map(|a| a.id))
    }
}

/// One async mutex per key, created on first use
///
/// Guards the dedup-check-then-insert critical section of the generate
/// path. Keys accumulate for the process lifetime, bounded by the
/// number of distinct (user, product, retailer, kind) tuples seen.
pub(crate) struct KeyedLocks {
    locks: Mutex<HashMap<String, std::sync::Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, key: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            std::sync::Arc::clone(
                locks
                    .entry(key.to_string())
                    .or_insert_with(|| std::sync::Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}
