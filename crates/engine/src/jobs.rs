// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Standard background jobs
//!
//! Job bodies only call into the orchestrator, the health monitor, or an
//! external feeder; the scheduler itself carries no business logic.
//! Availability scanning, hot-window prediction, and catalog ingestion
//! are external services behind the traits below, with no-op
//! implementations for deployments that have not wired them yet.

use crate::error::{JobError, SchedulerError};
use crate::health::WatchHealthMonitor;
use crate::orchestrator::AlertOrchestrator;
use crate::scheduler::JobScheduler;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use sw_core::{Clock, DeliveryDispatcher, IdGen, QuietHoursGate};
use sw_storage::Store;
use tracing::{debug, info};

/// Scans watched retailers and pushes signals at the orchestrator
#[async_trait]
pub trait AvailabilityScanner: Clone + Send + Sync + 'static {
    /// Returns the number of watches scanned
    async fn scan(&self) -> Result<u64, JobError>;
}

/// Predicts windows of elevated restock likelihood
#[async_trait]
pub trait HotWindowPredictor: Clone + Send + Sync + 'static {
    /// Whether a hot window is active right now
    async fn hot_window_active(&self) -> bool;

    /// Run the escalated scan used while a hot window is open
    async fn escalate(&self) -> Result<(), JobError>;

    /// Refresh model features and predictions
    async fn refresh(&self) -> Result<(), JobError>;
}

/// Pulls fresh catalog data (products, retailers) into the store
#[async_trait]
pub trait CatalogIngestor: Clone + Send + Sync + 'static {
    /// Returns the number of products ingested
    async fn ingest(&self) -> Result<u64, JobError>;
}

/// No-op scanner for deployments without a monitoring feed
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpScanner;

#[async_trait]
impl AvailabilityScanner for NoOpScanner {
    async fn scan(&self) -> Result<u64, JobError> {
        Ok(0)
    }
}

/// No-op predictor: never reports a hot window
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpPredictor;

#[async_trait]
impl HotWindowPredictor for NoOpPredictor {
    async fn hot_window_active(&self) -> bool {
        false
    }

    async fn escalate(&self) -> Result<(), JobError> {
        Ok(())
    }

    async fn refresh(&self) -> Result<(), JobError> {
        Ok(())
    }
}

/// No-op ingestor
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpIngestor;

#[async_trait]
impl CatalogIngestor for NoOpIngestor {
    async fn ingest(&self) -> Result<u64, JobError> {
        Ok(0)
    }
}

/// Intervals for the standard job set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobIntervals {
    #[serde(with = "humantime_serde")]
    pub availability_scan: Duration,
    #[serde(with = "humantime_serde")]
    pub hot_window_check: Duration,
    #[serde(with = "humantime_serde")]
    pub prediction_refresh: Duration,
    #[serde(with = "humantime_serde")]
    pub process_pending: Duration,
    #[serde(with = "humantime_serde")]
    pub retry_failed: Duration,
    #[serde(with = "humantime_serde")]
    pub watch_cleanup: Duration,
    #[serde(with = "humantime_serde")]
    pub catalog_ingest: Duration,
}

impl Default for JobIntervals {
    fn default() -> Self {
        Self {
            availability_scan: Duration::from_secs(2 * 60),
            hot_window_check: Duration::from_secs(30),
            prediction_refresh: Duration::from_secs(10 * 60),
            process_pending: Duration::from_secs(60),
            retry_failed: Duration::from_secs(5 * 60),
            watch_cleanup: Duration::from_secs(60 * 60),
            catalog_ingest: Duration::from_secs(6 * 60 * 60),
        }
    }
}

/// Register the standard job set on a scheduler
///
/// Every periodic concern of the pipeline lives here: scanning, hot
/// window escalation, prediction refresh, pending-alert processing,
/// failed-alert retry, watch/alert cleanup, and catalog ingestion.
#[allow(clippy::too_many_arguments)]
pub fn register_standard_jobs<S, D, Q, C, I, C2, Sc, Hp, Ci>(
    scheduler: &JobScheduler<C2>,
    intervals: &JobIntervals,
    orchestrator: Arc<AlertOrchestrator<S, D, Q, C, I>>,
    monitor: Arc<WatchHealthMonitor<S, C>>,
    scanner: Sc,
    predictor: Hp,
    ingestor: Ci,
) -> Result<(), SchedulerError>
where
    S: Store,
    D: DeliveryDispatcher,
    Q: QuietHoursGate,
    C: Clock,
    I: IdGen,
    C2: Clock,
    Sc: AvailabilityScanner,
    Hp: HotWindowPredictor,
    Ci: CatalogIngestor,
{
    {
        let scanner = scanner.clone();
        scheduler.register("availability-scan", intervals.availability_scan, move || {
            let scanner = scanner.clone();
            async move {
                let scanned = scanner.scan().await?;
                debug!(scanned, "availability scan complete");
                Ok(())
            }
        })?;
    }

    {
        let predictor = predictor.clone();
        scheduler.register("hot-window-check", intervals.hot_window_check, move || {
            let predictor = predictor.clone();
            async move {
                // Only does work while a hot window is open
                if predictor.hot_window_active().await {
                    info!("hot window active, running escalated scan");
                    predictor.escalate().await?;
                }
                Ok(())
            }
        })?;
    }

    {
        let predictor = predictor.clone();
        scheduler.register(
            "prediction-refresh",
            intervals.prediction_refresh,
            move || {
                let predictor = predictor.clone();
                async move { predictor.refresh().await }
            },
        )?;
    }

    {
        let orchestrator = Arc::clone(&orchestrator);
        scheduler.register("process-pending", intervals.process_pending, move || {
            let orchestrator = Arc::clone(&orchestrator);
            async move {
                let batch = orchestrator.limits().pending_batch_size;
                orchestrator.process_pending_alerts(batch).await?;
                Ok(())
            }
        })?;
    }

    {
        let orchestrator = Arc::clone(&orchestrator);
        scheduler.register("retry-failed", intervals.retry_failed, move || {
            let orchestrator = Arc::clone(&orchestrator);
            async move {
                orchestrator.retry_failed_alerts().await?;
                Ok(())
            }
        })?;
    }

    {
        let monitor = Arc::clone(&monitor);
        let retention = orchestrator.limits().alert_retention;
        scheduler.register("watch-cleanup", intervals.watch_cleanup, move || {
            let monitor = Arc::clone(&monitor);
            async move {
                monitor.cleanup_watches().await?;
                monitor.cleanup_alerts(retention).await?;
                Ok(())
            }
        })?;
    }

    {
        let ingestor = ingestor.clone();
        scheduler.register("catalog-ingest", intervals.catalog_ingest, move || {
            let ingestor = ingestor.clone();
            async move {
                let ingested = ingestor.ingest().await?;
                debug!(ingested, "catalog ingest complete");
                Ok(())
            }
        })?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
