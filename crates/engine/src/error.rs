// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the alert engine

use sw_storage::StoreError;
use thiserror::Error;

/// Errors raised to the caller of `generate_alert`
///
/// Validation and rate-limit refusals mean the signal should not have
/// been sent or is presently disallowed; the caller decides whether to
/// log-and-drop or surface upstream. Delivery failures never appear
/// here; they are recorded on the alert and left for the retry job.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Every violated rule, aggregated; no side effects were applied
    #[error("validation failed: {}", violations.join("; "))]
    Validation { violations: Vec<String> },
    /// The user is at or over the alert cap for the trailing window
    #[error("rate limit exceeded: {count} alerts in the trailing window (cap {cap})")]
    RateLimited { count: u64, cap: u32 },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from scheduler registration
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job already registered: {0}")]
    DuplicateJob(String),
}

/// Boxed error a job body may return; recorded on the job, never
/// propagated out of the scheduler
pub type JobError = Box<dyn std::error::Error + Send + Sync>;
