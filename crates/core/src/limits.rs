// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operational limits for alert generation and delivery

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits applied by the alert orchestrator and health monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertLimits {
    /// Window within which equivalent alerts fold into one
    #[serde(with = "humantime_serde")]
    pub dedup_window: Duration,
    /// Trailing window for the per-user alert cap
    #[serde(with = "humantime_serde")]
    pub rate_window: Duration,
    /// Maximum alerts per user inside the rate window
    pub hourly_alert_cap: u32,
    /// Delivery attempts before an alert is permanently failed
    pub max_retry_attempts: u32,
    /// Deferral applied when the quiet hours gate reports no next active time
    #[serde(with = "humantime_serde")]
    pub quiet_fallback_defer: Duration,
    /// Pending alerts processed per scheduler pass
    pub pending_batch_size: usize,
    /// Watches sampled for the system health estimate
    pub health_sample_size: usize,
    /// Age past which settled alerts are pruned
    #[serde(with = "humantime_serde")]
    pub alert_retention: Duration,
}

impl Default for AlertLimits {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(15 * 60),
            rate_window: Duration::from_secs(60 * 60),
            hourly_alert_cap: 50,
            max_retry_attempts: 3,
            quiet_fallback_defer: Duration::from_secs(60 * 60),
            pending_batch_size: 100,
            health_sample_size: 25,
            alert_retention: Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

impl AlertLimits {
    /// Create limits suitable for testing (lower values).
    pub fn for_testing() -> Self {
        Self {
            hourly_alert_cap: 5,
            max_retry_attempts: 3,
            pending_batch_size: 10,
            health_sample_size: 5,
            alert_retention: Duration::from_secs(60 * 60),
            ..Self::default()
        }
    }
}
