// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake collaborator implementations for testing

use super::dispatch::{DeliveryDispatcher, DeliveryError, DeliveryOutcome};
use super::quiet::{QuietDecision, QuietHoursGate};
use crate::alert::{Alert, AlertId, Channel};
use crate::user::{User, UserId};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Recorded delivery attempt
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryCall {
    pub alert_id: AlertId,
    pub user_id: UserId,
    pub channels: Vec<Channel>,
}

#[derive(Default)]
struct DispatcherState {
    calls: Vec<DeliveryCall>,
    scripted: VecDeque<DeliveryOutcome>,
    fail_message: Option<String>,
}

/// Dispatcher that records calls and plays back scripted outcomes
///
/// By default every requested channel succeeds. `fail_with` makes all
/// later attempts fail until `succeed` is called; `push_outcome` queues
/// one-shot outcomes that take precedence.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    state: Arc<Mutex<DispatcherState>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make all subsequent deliveries fail with the given error
    pub fn fail_with(&self, message: impl Into<String>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.fail_message = Some(message.into());
    }

    /// Restore the default all-channels-succeed behavior
    pub fn succeed(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.fail_message = None;
    }

    /// Queue a one-shot outcome for the next delivery
    pub fn push_outcome(&self, outcome: DeliveryOutcome) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.scripted.push_back(outcome);
    }

    /// All recorded delivery attempts, in order
    pub fn calls(&self) -> Vec<DeliveryCall> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.clone()
    }
}

#[async_trait]
impl DeliveryDispatcher for RecordingDispatcher {
    async fn deliver(
        &self,
        alert: &Alert,
        user: &User,
        channels: &[Channel],
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(DeliveryCall {
            alert_id: alert.id.clone(),
            user_id: user.id.clone(),
            channels: channels.to_vec(),
        });

        if let Some(outcome) = state.scripted.pop_front() {
            return Ok(outcome);
        }
        match &state.fail_message {
            Some(message) => Ok(DeliveryOutcome::failed(channels.to_vec(), message.clone())),
            None => Ok(DeliveryOutcome::delivered(channels.to_vec())),
        }
    }
}

/// Quiet gate with a scriptable decision
#[derive(Clone, Default)]
pub struct FixedQuiet {
    decision: Arc<Mutex<QuietDecision>>,
}

impl FixedQuiet {
    /// Start in the active (not quiet) state
    pub fn new() -> Self {
        Self::default()
    }

    /// Report quiet until the given instant
    pub fn quiet_until(&self, at: chrono::DateTime<chrono::Utc>) {
        self.set(QuietDecision::quiet_until(at));
    }

    /// Replace the decision wholesale
    pub fn set(&self, decision: QuietDecision) {
        let mut current = self.decision.lock().unwrap_or_else(|e| e.into_inner());
        *current = decision;
    }

    /// Back to active
    pub fn clear(&self) {
        self.set(QuietDecision::active());
    }
}

#[async_trait]
impl QuietHoursGate for FixedQuiet {
    async fn check(&self, _user_id: &UserId) -> QuietDecision {
        self.decision.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
