// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurring job scheduler
//!
//! Drives named background jobs at fixed intervals and records per-job
//! bookkeeping. Each job runs as an independent tokio task, so one job's
//! runtime never delays another's trigger. A job failure is caught at
//! the trigger boundary and recorded as `last_error`; it never stops
//! future triggers of that job or any other job. A tick that fires while
//! the previous run of the same job is still executing is skipped and
//! counted in `skipped_overlaps` rather than allowed to overlap.
//!
//! The scheduler is an explicit object constructed at startup and passed
//! by handle to whatever needs job-status introspection. Records live
//! for the process lifetime; `status` reads a snapshot without blocking
//! running jobs.

use crate::error::{JobError, SchedulerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sw_core::Clock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Bookkeeping for one registered job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub name: String,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    pub registered_at: DateTime<Utc>,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    #[serde(default, with = "humantime_serde")]
    pub last_duration: Option<Duration>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub skipped_overlaps: u64,
}

impl JobRecord {
    fn new(name: impl Into<String>, interval: Duration, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            interval,
            registered_at: now,
            last_started_at: None,
            last_finished_at: None,
            last_duration: None,
            last_success_at: None,
            last_error: None,
            run_count: 0,
            skipped_overlaps: 0,
        }
    }

    /// Next trigger instant, computed from the schedule and `now`
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.interval.as_millis().max(1).min(i64::MAX as u128) as i64;
        let elapsed = (now - self.registered_at).num_milliseconds();
        if elapsed < 0 {
            return self.registered_at + chrono::Duration::milliseconds(step);
        }
        let remaining = step - (elapsed % step);
        now + chrono::Duration::milliseconds(remaining)
    }
}

/// Point-in-time view of a job for the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(flatten)]
    pub record: JobRecord,
    pub next_run: DateTime<Utc>,
}

struct JobEntry {
    record: JobRecord,
    in_flight: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

type JobTable = Arc<Mutex<HashMap<String, JobEntry>>>;

/// Scheduler owning a set of named recurring jobs
pub struct JobScheduler<C: Clock> {
    clock: C,
    jobs: JobTable,
}

impl<C: Clock> Clone for JobScheduler<C> {
    fn clone(&self) -> Self {
        Self {
            clock: self.clock.clone(),
            jobs: Arc::clone(&self.jobs),
        }
    }
}

impl<C: Clock> JobScheduler<C> {
    /// Create an empty scheduler; must be used inside a tokio runtime
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a named job and begin triggering it every `interval`
    ///
    /// The first trigger fires one interval after registration.
    /// Re-registering a name is an error to prevent duplicate triggers.
    pub fn register<F, Fut>(
        &self,
        name: impl Into<String>,
        interval: Duration,
        job: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let name = name.into();
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        if jobs.contains_key(&name) {
            return Err(SchedulerError::DuplicateJob(name));
        }

        let record = JobRecord::new(&name, interval, self.clock.now());
        let in_flight = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(dispatch_loop(
            name.clone(),
            interval,
            job,
            Arc::clone(&self.jobs),
            Arc::clone(&in_flight),
            self.clock.clone(),
        ));
        jobs.insert(
            name,
            JobEntry {
                record,
                in_flight,
                handle,
            },
        );
        Ok(())
    }

    /// Snapshot every job's record plus its computed next trigger
    pub fn status(&self) -> Vec<JobStatus> {
        let now = self.clock.now();
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let mut statuses: Vec<JobStatus> = jobs
            .values()
            .map(|entry| JobStatus {
                record: entry.record.clone(),
                next_run: entry.record.next_run_after(now),
            })
            .collect();
        statuses.sort_by(|a, b| a.record.name.cmp(&b.record.name));
        statuses
    }

    /// Number of registered jobs
    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop triggering all jobs; records stay readable
    pub fn shutdown(&self) {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        for entry in jobs.values() {
            entry.handle.abort();
        }
    }
}

/// Tick on schedule and hand each run to its own task
///
/// Dispatch stays schedule-exact: a slow run delays nothing, it only
/// causes the overlapping ticks to be skipped via the in-flight flag.
async fn dispatch_loop<F, Fut, C>(
    name: String,
    interval: Duration,
    job: F,
    jobs: JobTable,
    in_flight: Arc<AtomicBool>,
    clock: C,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    C: Clock,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick resolves immediately; consume it so the first run
    // happens one interval after registration
    ticker.tick().await;

    loop {
        ticker.tick().await;

        if in_flight.swap(true, Ordering::SeqCst) {
            with_record(&jobs, &name, |record| record.skipped_overlaps += 1);
            debug!(job = %name, "previous run still in flight, skipping tick");
            continue;
        }

        let started = clock.now();
        with_record(&jobs, &name, |record| {
            record.last_started_at = Some(started);
        });

        let run = job();
        let jobs = Arc::clone(&jobs);
        let in_flight = Arc::clone(&in_flight);
        let name = name.clone();
        let clock = clock.clone();
        tokio::spawn(async move {
            let result = run.await;
            let finished = clock.now();
            with_record(&jobs, &name, |record| {
                record.last_finished_at = Some(finished);
                record.last_duration = (finished - started).to_std().ok();
                record.run_count += 1;
                match &result {
                    Ok(()) => {
                        record.last_success_at = Some(finished);
                        record.last_error = None;
                    }
                    Err(error) => record.last_error = Some(error.to_string()),
                }
            });
            if let Err(error) = result {
                warn!(job = %name, error = %error, "job run failed");
            }
            in_flight.store(false, Ordering::SeqCst);
        });
    }
}

fn with_record(jobs: &JobTable, name: &str, update: impl FnOnce(&mut JobRecord)) {
    let mut jobs = jobs.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(entry) = jobs.get_mut(name) {
        update(&mut entry.record);
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
