// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user alert rate limiting
//!
//! A trailing-window count, checked at creation time: a user at or over
//! the cap gets a typed refusal and no row is created.

use crate::error::GenerateError;
use crate::to_chrono;
use chrono::{DateTime, Utc};
use std::time::Duration;
use sw_core::UserId;
use sw_storage::Store;

/// Enforces the per-user alert cap over a trailing window
pub struct RateLimiter<S: Store> {
    store: S,
    window: Duration,
    cap: u32,
}

impl<S: Store> RateLimiter<S> {
    pub fn new(store: S, window: Duration, cap: u32) -> Self {
        Self { store, window, cap }
    }

    /// Refuse with `RateLimited` when the user has reached the cap
    pub async fn check(&self, user: &UserId, now: DateTime<Utc>) -> Result<(), GenerateError> {
        let since = now - to_chrono(self.window);
        let count = self.store.count_user_alerts_since(user, since).await?;
        if count >= u64::from(self.cap) {
            return Err(GenerateError::RateLimited {
                count,
                cap: self.cap,
            });
        }
        Ok(())
    }
}
