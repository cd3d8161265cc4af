// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery dispatcher contract

use crate::alert::{Alert, Channel};
use crate::user::User;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from a delivery attempt that never reached any channel
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("dispatcher unavailable: {0}")]
    Unavailable(String),
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// Per-channel result of a delivery attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub successful_channels: Vec<Channel>,
    pub failed_channels: Vec<Channel>,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    /// Every requested channel succeeded
    pub fn delivered(channels: Vec<Channel>) -> Self {
        Self {
            success: true,
            successful_channels: channels,
            failed_channels: Vec::new(),
            error: None,
        }
    }

    /// Every requested channel failed
    pub fn failed(channels: Vec<Channel>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            successful_channels: Vec::new(),
            failed_channels: channels,
            error: Some(error.into()),
        }
    }

    /// Mixed result; counts as success when any channel got through
    pub fn partial(
        successful: Vec<Channel>,
        failed: Vec<Channel>,
        error: Option<String>,
    ) -> Self {
        Self {
            success: !successful.is_empty(),
            successful_channels: successful,
            failed_channels: failed,
            error,
        }
    }
}

/// Attempts delivery across one or more channels
///
/// Implementations must not retry internally; retry policy belongs to
/// the orchestrator. They must also tolerate alerts that are still
/// Pending when handed over.
#[async_trait]
pub trait DeliveryDispatcher: Clone + Send + Sync + 'static {
    async fn deliver(
        &self,
        alert: &Alert,
        user: &User,
        channels: &[Channel],
    ) -> Result<DeliveryOutcome, DeliveryError>;
}
