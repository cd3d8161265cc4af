// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch health diagnostics and cleanup
//!
//! Read-only and light-write diagnostics over watch and pack records,
//! used on demand by operators and periodically by the cleanup job.
//! System-wide health is a sampled estimate: running full per-watch
//! checks over every active watch is too costly, so a configurable
//! sample stands in for the population and the report carries the
//! sample fields so it cannot be mistaken for an exact count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sw_core::{Clock, UserId, Watch, WatchId, WatchPackId};
use sw_storage::{Store, StoreError};
use tracing::{debug, info, warn};

/// Days without a delivery after which a previously-alerting watch is
/// flagged as informational
const STALE_ALERT_DAYS: i64 = 30;

/// Watches examined per page in user and cleanup scans
const SCAN_PAGE_SIZE: usize = 200;

/// Health record for one watch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchHealth {
    pub watch_id: WatchId,
    pub user_id: UserId,
    pub is_healthy: bool,
    pub last_alerted: Option<DateTime<Utc>>,
    pub alert_count: u64,
    /// Specific findings; present even for healthy watches (warnings
    /// and informational notes do not flip `is_healthy`)
    pub issues: Vec<String>,
}

/// Health record for one watch pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackHealth {
    pub pack_id: WatchPackId,
    pub is_healthy: bool,
    pub total_products: usize,
    pub active_product_count: usize,
    pub stored_subscriber_count: u64,
    pub active_subscriptions: u64,
    pub issues: Vec<String>,
}

/// Sampled system-wide health estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub total_watches: u64,
    pub active_watches: u64,
    pub total_packs: u64,
    pub active_packs: u64,
    /// Watches actually checked for the estimate
    pub sample_size: usize,
    pub healthy_in_sample: usize,
    /// healthy-in-sample / sample-size, scaled to the active population
    pub estimated_healthy_watches: u64,
}

/// Counts from one cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub watches_deactivated: u64,
    pub subscriptions_removed: u64,
}

/// Diagnostics over watch and pack records
pub struct WatchHealthMonitor<S: Store, C: Clock> {
    store: S,
    clock: C,
}

impl<S: Store, C: Clock> WatchHealthMonitor<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Health of a single watch, or None if it does not exist
    pub async fn check_watch_health(
        &self,
        id: &WatchId,
    ) -> Result<Option<WatchHealth>, StoreError> {
        let Some(watch) = self.store.get_watch(id).await? else {
            return Ok(None);
        };
        Ok(Some(self.evaluate(&watch).await?))
    }

    /// Health of every watch a user owns (bounded page)
    ///
    /// An individual check failure is logged and skipped; one broken
    /// watch must not hide the rest of the report.
    pub async fn check_user_watches_health(
        &self,
        user: &UserId,
    ) -> Result<Vec<WatchHealth>, StoreError> {
        let watches = self.store.list_user_watches(user, SCAN_PAGE_SIZE).await?;
        let mut reports = Vec::with_capacity(watches.len());
        for watch in &watches {
            match self.evaluate(watch).await {
                Ok(report) => reports.push(report),
                Err(error) => {
                    warn!(watch = %watch.id, error = %error, "watch health check skipped");
                }
            }
        }
        Ok(reports)
    }

    /// Health of a pack, or None if it does not exist
    pub async fn check_pack_health(
        &self,
        id: &WatchPackId,
    ) -> Result<Option<PackHealth>, StoreError> {
        let Some(pack) = self.store.get_pack(id).await? else {
            return Ok(None);
        };

        let mut issues = Vec::new();
        let mut is_healthy = true;

        let mut active_product_count = 0;
        for product_id in &pack.product_ids {
            match self.store.get_product(product_id).await? {
                Some(product) if product.is_active => active_product_count += 1,
                Some(_) => issues.push(format!("product is not active: {}", product_id)),
                None => issues.push(format!("product no longer exists: {}", product_id)),
            }
        }

        let total_products = pack.product_ids.len();
        if total_products == 0 {
            issues.push("pack has no products".to_string());
            is_healthy = false;
        } else if active_product_count * 2 < total_products {
            issues.push("fewer than half of pack products are active".to_string());
            is_healthy = false;
        }

        // Drift is reported, never auto-corrected here; reconciliation
        // is its own job
        let active_subscriptions = self.store.count_active_subscriptions(&pack.id).await?;
        if active_subscriptions != pack.subscriber_count {
            issues.push(format!(
                "subscriber count drift: stored {} but {} active subscriptions",
                pack.subscriber_count, active_subscriptions
            ));
        }

        Ok(Some(PackHealth {
            pack_id: pack.id,
            is_healthy,
            total_products,
            active_product_count,
            stored_subscriber_count: pack.subscriber_count,
            active_subscriptions,
            issues,
        }))
    }

    /// Aggregate counts plus a sampled health estimate
    pub async fn system_health(&self, sample_size: usize) -> Result<SystemHealth, StoreError> {
        let watch_counts = self.store.count_watches().await?;
        let pack_counts = self.store.count_packs().await?;

        let sample = self.store.list_active_watches(0, sample_size).await?;
        let mut healthy_in_sample = 0;
        for watch in &sample {
            match self.evaluate(watch).await {
                Ok(report) if report.is_healthy => healthy_in_sample += 1,
                Ok(_) => {}
                Err(error) => {
                    warn!(watch = %watch.id, error = %error, "sampled health check skipped");
                }
            }
        }

        let estimated_healthy_watches = if sample.is_empty() {
            0
        } else {
            (healthy_in_sample as u64 * watch_counts.active) / sample.len() as u64
        };

        Ok(SystemHealth {
            total_watches: watch_counts.total,
            active_watches: watch_counts.active,
            total_packs: pack_counts.total,
            active_packs: pack_counts.active,
            sample_size: sample.len(),
            healthy_in_sample,
            estimated_healthy_watches,
        })
    }

    /// Deactivate watches of dead products and drop stale pack
    /// subscriptions; idempotent by construction
    pub async fn cleanup_watches(&self) -> Result<CleanupOutcome, StoreError> {
        let now = self.clock.now();
        let mut outcome = CleanupOutcome::default();

        let mut offset = 0;
        loop {
            let page = self.store.list_active_watches(offset, SCAN_PAGE_SIZE).await?;
            if page.is_empty() {
                break;
            }
            offset += page.len();
            for watch in &page {
                let product_gone = match self.store.get_product(&watch.product_id).await? {
                    Some(product) => !product.is_active,
                    None => true,
                };
                if product_gone && self.store.deactivate_watch(&watch.id, now).await? {
                    debug!(watch = %watch.id, product = %watch.product_id, "watch deactivated");
                    outcome.watches_deactivated += 1;
                    // Deactivated rows leave the active listing, so the
                    // next page shifts back by one
                    offset -= 1;
                }
            }
        }

        for subscription in self.store.list_subscriptions().await? {
            let stale = match self.store.get_pack(&subscription.pack_id).await? {
                Some(pack) => !pack.is_active,
                None => true,
            };
            if stale && self.store.remove_subscription(&subscription.id).await? {
                debug!(subscription = %subscription.id, "stale subscription removed");
                outcome.subscriptions_removed += 1;
            }
        }

        if outcome != CleanupOutcome::default() {
            info!(
                watches = outcome.watches_deactivated,
                subscriptions = outcome.subscriptions_removed,
                "watch cleanup complete"
            );
        }
        Ok(outcome)
    }

    /// Prune settled alerts older than the retention window
    pub async fn cleanup_alerts(
        &self,
        retention: std::time::Duration,
    ) -> Result<u64, StoreError> {
        let cutoff = self.clock.now() - crate::to_chrono(retention);
        let removed = self.store.prune_alerts_before(cutoff).await?;
        if removed > 0 {
            info!(removed, "old alerts pruned");
        }
        Ok(removed)
    }

    async fn evaluate(&self, watch: &Watch) -> Result<WatchHealth, StoreError> {
        let mut issues = Vec::new();
        let mut is_healthy = true;

        match self.store.get_product(&watch.product_id).await? {
            None => {
                issues.push("product no longer exists".to_string());
                is_healthy = false;
            }
            Some(product) if !product.is_active => {
                issues.push("product is not active".to_string());
                is_healthy = false;
            }
            Some(_) => {}
        }

        if watch.retailer_ids.is_empty() {
            issues.push("no retailers configured".to_string());
            is_healthy = false;
        }

        let in_store = watch
            .availability
            .map(|a| a.includes_in_store())
            .unwrap_or(false);
        if in_store && watch.zip_code.is_none() {
            issues.push("in-store monitoring configured without a zip code".to_string());
            is_healthy = false;
        }
        // Warning only: a zip without a radius still monitors, just wider
        if watch.zip_code.is_some() && watch.radius_miles.is_none() {
            issues.push("zip code configured without a radius".to_string());
        }

        // Informational: the watch did alert once, then went quiet
        if let Some(last) = watch.last_alerted {
            if self.clock.now() - last >= chrono::Duration::days(STALE_ALERT_DAYS) {
                issues.push(format!("no alerts in the last {} days", STALE_ALERT_DAYS));
            }
        }

        Ok(WatchHealth {
            watch_id: watch.id.clone(),
            user_id: watch.user_id.clone(),
            is_healthy,
            last_alerted: watch.last_alerted,
            alert_count: watch.alert_count,
            issues,
        })
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
