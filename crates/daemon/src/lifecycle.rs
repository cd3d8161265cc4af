// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: configuration, startup, shutdown.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sw_core::{AlertLimits, NeverQuiet, SystemClock, UuidIdGen};
use sw_engine::{
    register_standard_jobs, AlertOrchestrator, JobIntervals, JobScheduler, NoOpIngestor,
    NoOpPredictor, NoOpScanner, SchedulerError, WatchHealthMonitor,
};
use sw_storage::{JsonStore, StoreError};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::info;

use crate::webhook::WebhookDispatcher;

/// Daemon runtime with concrete collaborator types
///
/// Quiet-hours evaluation is an external collaborator; the stock daemon
/// wires the permissive gate and a deployment substitutes its own.
pub type DaemonOrchestrator =
    AlertOrchestrator<JsonStore, WebhookDispatcher, NeverQuiet, SystemClock, UuidIdGen>;

/// Health monitor over the daemon store
pub type DaemonMonitor = WatchHealthMonitor<JsonStore, SystemClock>;

/// Errors during daemon startup and shutdown
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("deployment root not found: {0}: {1}")]
    DeploymentNotFound(PathBuf, std::io::Error),
    #[error("another daemon already holds the lock at {0}")]
    AlreadyRunning(PathBuf),
    #[error("no usable state directory")]
    NoStateDir,
    #[error("settings error: {0}")]
    Settings(#[from] toml::de::Error),
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon configuration derived from the deployment root
#[derive(Debug, Clone)]
pub struct Config {
    /// Deployment root directory (holds shelfwatch.toml)
    pub root: PathBuf,
    /// Per-deployment state directory
    pub state_dir: PathBuf,
    /// Path to the control socket
    pub socket_path: PathBuf,
    /// Path to the lock/PID file
    pub lock_path: PathBuf,
    /// Path to the daemon log file
    pub log_path: PathBuf,
    /// Path to the settings file
    pub settings_path: PathBuf,
}

impl Config {
    /// Create config for a deployment root
    pub fn for_deployment(root: &Path) -> Result<Self, LifecycleError> {
        let canonical = root
            .canonicalize()
            .map_err(|e| LifecycleError::DeploymentNotFound(root.to_path_buf(), e))?;

        let hash = deployment_hash(&canonical);
        let state_dir = state_dir()?.join("deployments").join(&hash);

        Ok(Self {
            settings_path: canonical.join("shelfwatch.toml"),
            root: canonical,
            socket_path: state_dir.join("swd.sock"),
            lock_path: state_dir.join("swd.pid"),
            log_path: state_dir.join("swd.log"),
            state_dir,
        })
    }
}

/// Settings read from shelfwatch.toml; everything has a default
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub intervals: JobIntervals,
    pub limits: AlertLimits,
    /// Channel code to webhook endpoint URL
    pub webhooks: BTreeMap<String, String>,
}

impl Settings {
    /// Load settings, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): held to maintain the exclusive file lock;
    // released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Control socket listener
    pub listener: UnixListener,
    /// Scheduler driving the standard job set
    pub scheduler: JobScheduler<SystemClock>,
    /// Orchestration core, shared with the scheduled jobs
    pub orchestrator: Arc<DaemonOrchestrator>,
    /// Health monitor, shared with the cleanup job
    pub monitor: Arc<DaemonMonitor>,
    /// Limits in force (also the default health sample size)
    pub limits: AlertLimits,
    /// When the daemon started
    pub start_time: Instant,
    /// Shutdown requested over the socket
    pub shutdown_requested: bool,
}

/// Start the daemon for a deployment
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    fs::create_dir_all(&config.state_dir)?;

    // Single instance per deployment, enforced by an exclusive lock.
    // Opened without truncation so a losing contender cannot clobber
    // the winner's pid.
    let mut lock_file = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| LifecycleError::AlreadyRunning(config.lock_path.clone()))?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let settings = Settings::load(&config.settings_path)?;
    info!(root = %config.root.display(), "settings loaded");

    // A stale socket from a crashed daemon would block the bind
    if config.socket_path.exists() {
        fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)?;

    let store = JsonStore::open(config.state_dir.join("store"))?;
    let dispatcher = WebhookDispatcher::from_settings(&settings.webhooks);
    if dispatcher.is_empty() {
        info!("no webhooks configured; deliveries will fail until they are");
    }

    let orchestrator = Arc::new(AlertOrchestrator::new(
        store.clone(),
        dispatcher,
        NeverQuiet,
        SystemClock,
        UuidIdGen,
        settings.limits.clone(),
    ));
    let monitor = Arc::new(WatchHealthMonitor::new(store, SystemClock));

    let scheduler = JobScheduler::new(SystemClock);
    register_standard_jobs(
        &scheduler,
        &settings.intervals,
        Arc::clone(&orchestrator),
        Arc::clone(&monitor),
        NoOpScanner,
        NoOpPredictor,
        NoOpIngestor,
    )?;
    info!(jobs = scheduler.len(), "standard jobs registered");

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        scheduler,
        orchestrator,
        monitor,
        limits: settings.limits,
        start_time: Instant::now(),
        shutdown_requested: false,
    })
}

impl DaemonState {
    /// Stop all jobs and remove the socket and lock files
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        self.scheduler.shutdown();
        if self.config.socket_path.exists() {
            fs::remove_file(&self.config.socket_path)?;
        }
        if self.config.lock_path.exists() {
            fs::remove_file(&self.config.lock_path)?;
        }
        info!(
            uptime = %humantime::format_duration(self.start_time.elapsed()),
            "daemon shut down"
        );
        Ok(())
    }
}

fn deployment_hash(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    // 16 hex chars is plenty to keep deployments apart
    digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

fn state_dir() -> Result<PathBuf, LifecycleError> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|dir| dir.join("shelfwatch"))
        .ok_or(LifecycleError::NoStateDir)
}
