// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sw-engine: orchestration core for the Shelfwatch alert platform
//!
//! This crate provides:
//! - The alert orchestrator (generate, process, pending batch, retry)
//! - Deduplication and per-user rate limiting gates
//! - The recurring job scheduler with per-job bookkeeping
//! - The watch health monitor and cleanup passes

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dedup;
pub mod error;
pub mod health;
pub mod jobs;
pub mod orchestrator;
pub mod rate_limit;
pub mod scheduler;

pub use dedup::{DedupGate, DedupKey};
pub use error::{GenerateError, JobError, SchedulerError};
pub use health::{
    CleanupOutcome, PackHealth, SystemHealth, WatchHealth, WatchHealthMonitor,
};
pub use jobs::{
    AvailabilityScanner, CatalogIngestor, HotWindowPredictor, JobIntervals, NoOpIngestor,
    NoOpPredictor, NoOpScanner, register_standard_jobs,
};
pub use orchestrator::{
    AlertOrchestrator, BatchOutcome, Disposition, GenerateOutcome, ProcessResult, RetryOutcome,
};
pub use rate_limit::RateLimiter;
pub use scheduler::{JobRecord, JobScheduler, JobStatus};

/// Convert a std duration into a chrono interval for timestamp math
pub(crate) fn to_chrono(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(duration.as_millis().min(i64::MAX as u128) as i64)
}
