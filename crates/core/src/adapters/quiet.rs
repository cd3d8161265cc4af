// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Quiet hours gate contract
//!
//! The orchestrator never interprets a user's raw do-not-disturb
//! schedule. It consumes this decision contract, so timezone and
//! day-of-week rules live entirely in the implementing service.

use crate::user::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Outcome of a quiet hours check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuietDecision {
    pub is_quiet: bool,
    /// When delivery may resume; deferral falls back to a configured
    /// delay when absent
    pub next_active: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl QuietDecision {
    /// The user is deliverable right now
    pub fn active() -> Self {
        Self::default()
    }

    /// The user is quiet until the given instant
    pub fn quiet_until(at: DateTime<Utc>) -> Self {
        Self {
            is_quiet: true,
            next_active: Some(at),
            reason: None,
        }
    }

    /// The user is quiet with no known end
    pub fn quiet(reason: impl Into<String>) -> Self {
        Self {
            is_quiet: true,
            next_active: None,
            reason: Some(reason.into()),
        }
    }
}

/// Decides whether a user is currently in a do-not-disturb window
#[async_trait]
pub trait QuietHoursGate: Clone + Send + Sync + 'static {
    async fn check(&self, user_id: &UserId) -> QuietDecision;
}

/// Gate that never reports quiet hours
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverQuiet;

#[async_trait]
impl QuietHoursGate for NeverQuiet {
    async fn check(&self, _user_id: &UserId) -> QuietDecision {
        QuietDecision::active()
    }
}
