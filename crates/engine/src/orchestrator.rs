// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert orchestrator
//!
//! Turns monitoring signals into delivered alerts. Generation runs a
//! strict validate -> dedup -> rate-limit -> create -> quiet-hours ->
//! deliver order; no step is skipped or reordered. Delivery failures are
//! recorded on the alert and left for the retry job; validation and
//! rate-limit refusals surface to the caller as typed errors with no
//! side effects.
//!
//! Callers should treat `generate_alert` as at-least-once: there is no
//! cancellation token, and a committed write is not rolled back when a
//! caller stops waiting.

use crate::dedup::{DedupGate, DedupKey, KeyedLocks};
use crate::error::GenerateError;
use crate::rate_limit::RateLimiter;
use crate::to_chrono;
use chrono::{DateTime, Utc};
use sw_core::{
    strategy, Alert, AlertId, AlertLimits, AlertRequest, AlertStatus, Channel, Clock,
    DeliveryOutcome, IdGen, Product, QuietHoursGate, User, Watch, WatchId,
};
use sw_core::{DeliveryDispatcher, QuietDecision};
use sw_storage::{Store, StoreError};
use tracing::{debug, info, warn};

/// What happened to a generate call, with the status a caller reports
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateOutcome {
    /// Created and delivered in-line
    Processed {
        alert_id: AlertId,
        result: ProcessResult,
    },
    /// Created but the in-line delivery attempt failed; the retry job
    /// owns it now
    Failed {
        alert_id: AlertId,
        result: ProcessResult,
    },
    /// Created and deferred around quiet hours
    Scheduled {
        alert_id: AlertId,
        scheduled_for: DateTime<Utc>,
    },
    /// Folded into an existing live alert; nothing was created
    Deduplicated { original: AlertId },
}

impl GenerateOutcome {
    /// The alert this outcome refers to
    pub fn alert_id(&self) -> &AlertId {
        match self {
            GenerateOutcome::Processed { alert_id, .. }
            | GenerateOutcome::Failed { alert_id, .. }
            | GenerateOutcome::Scheduled { alert_id, .. } => alert_id,
            GenerateOutcome::Deduplicated { original } => original,
        }
    }

    /// The status reported to signal producers
    pub fn status(&self) -> AlertStatus {
        match self {
            GenerateOutcome::Processed { .. } => AlertStatus::Sent,
            GenerateOutcome::Failed { .. } => AlertStatus::Failed,
            GenerateOutcome::Scheduled { .. } => AlertStatus::Scheduled,
            GenerateOutcome::Deduplicated { .. } => AlertStatus::Deduplicated,
        }
    }
}

/// How a single delivery attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Delivered,
    Rescheduled,
    Failed,
}

/// Structured result of one `process_alert` call
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    pub disposition: Disposition,
    pub channels_used: Vec<Channel>,
    pub failure_reason: Option<String>,
    pub rescheduled_for: Option<DateTime<Utc>>,
}

impl ProcessResult {
    fn delivered(channels: Vec<Channel>) -> Self {
        Self {
            disposition: Disposition::Delivered,
            channels_used: channels,
            failure_reason: None,
            rescheduled_for: None,
        }
    }

    fn rescheduled(until: DateTime<Utc>) -> Self {
        Self {
            disposition: Disposition::Rescheduled,
            channels_used: Vec::new(),
            failure_reason: None,
            rescheduled_for: Some(until),
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            disposition: Disposition::Failed,
            channels_used: Vec::new(),
            failure_reason: Some(reason.into()),
            rescheduled_for: None,
        }
    }

    pub fn success(&self) -> bool {
        self.disposition == Disposition::Delivered
    }
}

/// Counts from a pending-alert pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: usize,
    pub failed: usize,
    pub rescheduled: usize,
}

/// Counts from a retry pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryOutcome {
    pub attempted: usize,
    pub recovered: usize,
    pub exhausted: usize,
}

enum RetryDisposition {
    Recovered,
    StillFailing,
    Exhausted,
}

/// The orchestration core: generates, gates, schedules, delivers, and
/// retries alerts, updating watch statistics on the success path
pub struct AlertOrchestrator<S, D, Q, C, I>
where
    S: Store,
    D: DeliveryDispatcher,
    Q: QuietHoursGate,
    C: Clock,
    I: IdGen,
{
    store: S,
    dispatcher: D,
    quiet: Q,
    clock: C,
    ids: I,
    limits: AlertLimits,
    dedup: DedupGate<S>,
    rate: RateLimiter<S>,
    locks: KeyedLocks,
}

impl<S, D, Q, C, I> AlertOrchestrator<S, D, Q, C, I>
where
    S: Store,
    D: DeliveryDispatcher,
    Q: QuietHoursGate,
    C: Clock,
    I: IdGen,
{
    pub fn new(store: S, dispatcher: D, quiet: Q, clock: C, ids: I, limits: AlertLimits) -> Self {
        let dedup = DedupGate::new(store.clone(), limits.dedup_window);
        let rate = RateLimiter::new(store.clone(), limits.rate_window, limits.hourly_alert_cap);
        Self {
            store,
            dispatcher,
            quiet,
            clock,
            ids,
            limits,
            dedup,
            rate,
            locks: KeyedLocks::new(),
        }
    }

    pub fn limits(&self) -> &AlertLimits {
        &self.limits
    }

    /// Turn one monitoring signal into an alert
    ///
    /// Validation failures and rate-limit refusals return errors and
    /// apply no side effects. Dedup hits return the original alert's id.
    /// Otherwise the alert row is created, then delivered now or
    /// deferred around quiet hours.
    pub async fn generate_alert(
        &self,
        request: AlertRequest,
    ) -> Result<GenerateOutcome, GenerateError> {
        let (_user, product) = self.validate(&request).await?;
        let now = self.clock.now();

        let key = DedupKey::from_request(&request);
        let guard = self.locks.acquire(&key.lock_key()).await;
        if let Some(original) = self.dedup.find_existing(&key, now).await? {
            debug!(alert = %original, user = %request.user_id, "duplicate signal folded into existing alert");
            return Ok(GenerateOutcome::Deduplicated { original });
        }

        self.rate.check(&request.user_id, now).await?;

        let priority = request
            .priority
            .unwrap_or_else(|| strategy::priority_for(request.kind, &request.data, product.popularity));
        let alert = Alert::from_request(AlertId::from(self.ids.next()), &request, priority, now);
        self.store.insert_alert(&alert).await?;
        drop(guard);
        info!(
            alert = %alert.id,
            user = %alert.user_id,
            kind = %alert.kind,
            priority = %alert.priority,
            "alert created"
        );

        let decision = self.quiet.check(&request.user_id).await;
        if decision.is_quiet {
            let until = self.deferral_instant(&decision, now);
            let mut alert = alert;
            alert.defer_until(until, now);
            self.store.update_alert(&alert).await?;
            debug!(alert = %alert.id, until = %until, "delivery deferred for quiet hours");
            return Ok(GenerateOutcome::Scheduled {
                alert_id: alert.id,
                scheduled_for: until,
            });
        }

        let result = self.process_alert(&alert.id).await?;
        Ok(match result.disposition {
            Disposition::Delivered => GenerateOutcome::Processed {
                alert_id: alert.id,
                result,
            },
            Disposition::Rescheduled => GenerateOutcome::Scheduled {
                alert_id: alert.id,
                scheduled_for: result.rescheduled_for.unwrap_or(now),
            },
            Disposition::Failed => GenerateOutcome::Failed {
                alert_id: alert.id,
                result,
            },
        })
    }

    /// Attempt delivery of one alert
    ///
    /// Re-checks quiet hours first: a scheduled alert may now be due, or
    /// the user may have entered quiet hours since creation. Internal
    /// errors are caught, recorded on the alert, and returned as a
    /// failure result rather than propagated.
    pub async fn process_alert(&self, id: &AlertId) -> Result<ProcessResult, GenerateError> {
        let Some(mut alert) = self.store.get_alert(id).await? else {
            return Err(GenerateError::NotFound {
                kind: "alert",
                id: id.to_string(),
            });
        };

        match self.attempt_delivery(&mut alert).await {
            Ok(result) => Ok(result),
            Err(error) => {
                let reason = error.to_string();
                warn!(alert = %alert.id, error = %reason, "alert processing failed");
                alert.mark_failed(reason.clone(), self.clock.now());
                if let Err(persist) = self.store.update_alert(&alert).await {
                    warn!(alert = %alert.id, error = %persist, "failed to persist failure status");
                }
                Ok(ProcessResult::failed(reason))
            }
        }
    }

    /// Process up to `limit` due pending alerts; one alert's failure
    /// never aborts the rest of the batch
    pub async fn process_pending_alerts(&self, limit: usize) -> Result<BatchOutcome, GenerateError> {
        let now = self.clock.now();
        let due = self.store.list_due_pending_alerts(now, limit).await?;
        let mut outcome = BatchOutcome::default();

        for alert in due {
            match self.process_alert(&alert.id).await {
                Ok(result) => match result.disposition {
                    Disposition::Delivered => outcome.processed += 1,
                    Disposition::Rescheduled => outcome.rescheduled += 1,
                    Disposition::Failed => outcome.failed += 1,
                },
                Err(error) => {
                    warn!(alert = %alert.id, error = %error, "pending alert skipped");
                    outcome.failed += 1;
                }
            }
        }
        if outcome != BatchOutcome::default() {
            info!(
                processed = outcome.processed,
                failed = outcome.failed,
                rescheduled = outcome.rescheduled,
                "pending alert pass complete"
            );
        }
        Ok(outcome)
    }

    /// Re-attempt failed alerts still under the retry cap
    ///
    /// Every attempt counts against the budget whatever its outcome; an
    /// alert that exhausts the budget is marked permanently failed and
    /// never picked up again.
    pub async fn retry_failed_alerts(&self) -> Result<RetryOutcome, GenerateError> {
        let max_retries = self.limits.max_retry_attempts;
        let retryable = self.store.list_retryable_alerts(max_retries).await?;
        let mut outcome = RetryOutcome::default();

        for alert in retryable {
            outcome.attempted += 1;
            match self.retry_one(alert, max_retries).await {
                Ok(RetryDisposition::Recovered) => outcome.recovered += 1,
                Ok(RetryDisposition::Exhausted) => outcome.exhausted += 1,
                Ok(RetryDisposition::StillFailing) => {}
                Err(error) => {
                    warn!(error = %error, "retry attempt skipped");
                }
            }
        }
        Ok(outcome)
    }

    async fn retry_one(
        &self,
        mut alert: Alert,
        max_retries: u32,
    ) -> Result<RetryDisposition, GenerateError> {
        alert.begin_retry(self.clock.now());
        self.store.update_alert(&alert).await?;

        let result = self.process_alert(&alert.id).await?;
        if result.success() {
            return Ok(RetryDisposition::Recovered);
        }

        if alert.retry_count >= max_retries {
            if let Some(mut exhausted) = self.store.get_alert(&alert.id).await? {
                if exhausted.status == AlertStatus::Failed {
                    exhausted.mark_failed("max retry attempts exceeded", self.clock.now());
                    self.store.update_alert(&exhausted).await?;
                    info!(alert = %exhausted.id, "alert permanently failed");
                }
            }
            return Ok(RetryDisposition::Exhausted);
        }
        Ok(RetryDisposition::StillFailing)
    }

    /// Validation per the generate contract: aggregate every violated
    /// rule; apply nothing on failure. The user, product, and watch
    /// lookups run concurrently to bound latency.
    async fn validate(&self, request: &AlertRequest) -> Result<(User, Product), GenerateError> {
        let mut violations = Vec::new();
        if request.user_id.0.trim().is_empty() {
            violations.push("user id is required".to_string());
        }
        if request.product_id.0.trim().is_empty() {
            violations.push("product id is required".to_string());
        }
        if request.retailer_id.0.trim().is_empty() {
            violations.push("retailer id is required".to_string());
        }
        violations.extend(request.data.violations());

        let (user, product, watch) = tokio::join!(
            self.store.get_user(&request.user_id),
            self.store.get_product(&request.product_id),
            self.load_watch(request.watch_id.as_ref()),
        );
        let (user, product, watch) = (user?, product?, watch?);

        match &user {
            None => violations.push("user not found".to_string()),
            Some(user) if !user.email_verified => {
                violations.push("user email is not verified".to_string());
            }
            Some(_) => {}
        }
        match &product {
            None => violations.push("product not found".to_string()),
            Some(product) if !product.is_active => {
                violations.push("product is not active".to_string());
            }
            Some(_) => {}
        }
        if let Some(watch_id) = &request.watch_id {
            match &watch {
                None => violations.push(format!("watch not found: {}", watch_id)),
                Some(watch) => {
                    if !watch.is_active {
                        violations.push("watch is not active".to_string());
                    }
                    if watch.user_id != request.user_id {
                        violations.push("watch belongs to a different user".to_string());
                    }
                }
            }
        }

        match (user, product) {
            (Some(user), Some(product)) if violations.is_empty() => Ok((user, product)),
            _ => Err(GenerateError::Validation { violations }),
        }
    }

    async fn load_watch(&self, id: Option<&WatchId>) -> Result<Option<Watch>, StoreError> {
        match id {
            Some(id) => self.store.get_watch(id).await,
            None => Ok(None),
        }
    }

    fn deferral_instant(&self, decision: &QuietDecision, now: DateTime<Utc>) -> DateTime<Utc> {
        decision
            .next_active
            .unwrap_or_else(|| now + to_chrono(self.limits.quiet_fallback_defer))
    }

    async fn attempt_delivery(&self, alert: &mut Alert) -> Result<ProcessResult, GenerateError> {
        let now = self.clock.now();

        let decision = self.quiet.check(&alert.user_id).await;
        if decision.is_quiet {
            let until = self.deferral_instant(&decision, now);
            alert.defer_until(until, now);
            self.store.update_alert(alert).await?;
            debug!(alert = %alert.id, until = %until, "still in quiet hours, rescheduled");
            return Ok(ProcessResult::rescheduled(until));
        }

        let Some(user) = self.store.get_user(&alert.user_id).await? else {
            alert.mark_failed("user not found", now);
            self.store.update_alert(alert).await?;
            return Ok(ProcessResult::failed("user not found"));
        };

        let channels = strategy::channels_for(alert.kind, &user);
        if channels.is_empty() {
            alert.mark_failed("no delivery channels available", now);
            self.store.update_alert(alert).await?;
            return Ok(ProcessResult::failed("no delivery channels available"));
        }

        let outcome = match self.dispatcher.deliver(alert, &user, &channels).await {
            Ok(outcome) => outcome,
            Err(error) => DeliveryOutcome::failed(channels.clone(), error.to_string()),
        };

        let now = self.clock.now();
        if outcome.success {
            alert.mark_sent(outcome.successful_channels.clone(), now);
            self.store.update_alert(alert).await?;
            // Watch statistics move only on this success path
            if let Some(watch_id) = alert.watch_id.clone() {
                if let Err(error) = self.store.record_watch_alert(&watch_id, now).await {
                    warn!(watch = %watch_id, error = %error, "watch stat update failed");
                }
            }
            info!(
                alert = %alert.id,
                channels = ?outcome.successful_channels,
                "alert delivered"
            );
            Ok(ProcessResult::delivered(outcome.successful_channels))
        } else {
            let reason = outcome
                .error
                .unwrap_or_else(|| "delivery failed on all channels".to_string());
            alert.mark_failed(reason.clone(), now);
            self.store.update_alert(alert).await?;
            Ok(ProcessResult::failed(reason))
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
