// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert records and delivery channels
//!
//! An alert is a single notification instance for one retail availability
//! event. The orchestrator drives its status: alerts are created Pending,
//! deferred (with `scheduled_for` set) while the owner is in quiet hours,
//! and end up Sent or Failed once delivery has been attempted. Scheduled
//! and Deduplicated are reported to callers but never stored on a row.

use crate::product::{ProductId, RetailerId};
use crate::user::UserId;
use crate::watch::WatchId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an alert
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub String);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AlertId {
    fn from(s: String) -> Self {
        AlertId(s)
    }
}

impl From<&str> for AlertId {
    fn from(s: &str) -> Self {
        AlertId(s.to_string())
    }
}

/// Kind of retail event an alert reports
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Restock,
    PriceDrop,
    LowStock,
    PreOrder,
}

impl AlertKind {
    /// All known kinds, in escalation-check order
    pub const ALL: [AlertKind; 4] = [
        AlertKind::Restock,
        AlertKind::PriceDrop,
        AlertKind::LowStock,
        AlertKind::PreOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Restock => "restock",
            AlertKind::PriceDrop => "price_drop",
            AlertKind::LowStock => "low_stock",
            AlertKind::PreOrder => "pre_order",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restock" => Ok(AlertKind::Restock),
            "price_drop" => Ok(AlertKind::PriceDrop),
            "low_stock" => Ok(AlertKind::LowStock),
            "pre_order" => Ok(AlertKind::PreOrder),
            _ => Err(format!("unknown alert kind: {}", s)),
        }
    }
}

/// Delivery urgency for an alert
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl AlertPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertPriority::Low => "low",
            AlertPriority::Medium => "medium",
            AlertPriority::High => "high",
            AlertPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The current status of an alert
///
/// Rows only ever hold Pending, Sent, or Failed; Scheduled and
/// Deduplicated are outcome statuses reported by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Scheduled,
    Sent,
    Failed,
    Deduplicated,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Scheduled => "scheduled",
            AlertStatus::Sent => "sent",
            AlertStatus::Failed => "failed",
            AlertStatus::Deduplicated => "deduplicated",
        }
    }

    /// Delivery has been attempted and will not be re-attempted outside
    /// the retry pass
    pub fn is_settled(&self) -> bool {
        matches!(self, AlertStatus::Sent | AlertStatus::Failed)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A delivery mechanism through which an alert reaches a user
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    WebPush,
    Email,
    Sms,
    Discord,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::WebPush => "web_push",
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Discord => "discord",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web_push" => Ok(Channel::WebPush),
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            "discord" => Ok(Channel::Discord),
            _ => Err(format!("unknown channel: {}", s)),
        }
    }
}

/// Event payload attached to an alert
///
/// Product name, retailer name, and product URL are required; the rest is
/// whatever the monitoring signal knew about the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertData {
    pub product_name: String,
    pub retailer_name: String,
    pub product_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price_cents: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart_url: Option<String>,
}

impl AlertData {
    /// Payload rule violations; empty when the payload is valid
    pub fn violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.product_name.trim().is_empty() {
            violations.push("product name is required".to_string());
        }
        if self.retailer_name.trim().is_empty() {
            violations.push("retailer name is required".to_string());
        }
        if !is_http_url(&self.product_url) {
            violations.push(format!(
                "product url is not a valid http(s) url: {:?}",
                self.product_url
            ));
        }
        violations
    }

    /// Price drop as a percentage of the original price, when both prices
    /// are present and the new price is actually lower
    pub fn price_drop_percent(&self) -> Option<f64> {
        let original = self.original_price_cents?;
        let current = self.price_cents?;
        if original == 0 || current >= original {
            return None;
        }
        Some((original - current) as f64 * 100.0 / original as f64)
    }
}

/// Syntactic check only: scheme plus a non-empty host, no whitespace
fn is_http_url(raw: &str) -> bool {
    let Some(rest) = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
    else {
        return false;
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    !host.is_empty() && !raw.contains(char::is_whitespace)
}

/// An incoming monitoring signal requesting an alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub retailer_id: RetailerId,
    pub kind: AlertKind,
    #[serde(default)]
    pub watch_id: Option<WatchId>,
    /// Explicit priority override; normally computed by the strategy
    #[serde(default)]
    pub priority: Option<AlertPriority>,
    pub data: AlertData,
}

/// A single notification instance for one retail availability event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub retailer_id: RetailerId,
    #[serde(default)]
    pub watch_id: Option<WatchId>,
    pub kind: AlertKind,
    pub priority: AlertPriority,
    pub status: AlertStatus,
    pub data: AlertData,
    /// Channels the alert was actually delivered on
    #[serde(default)]
    pub delivery_channels: Vec<Channel>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    /// Create a Pending alert from a validated request
    pub fn from_request(
        id: AlertId,
        request: &AlertRequest,
        priority: AlertPriority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: request.user_id.clone(),
            product_id: request.product_id.clone(),
            retailer_id: request.retailer_id.clone(),
            watch_id: request.watch_id.clone(),
            kind: request.kind,
            priority,
            status: AlertStatus::Pending,
            data: request.data.clone(),
            delivery_channels: Vec::new(),
            retry_count: 0,
            scheduled_for: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the alert is eligible for a delivery attempt at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for.map_or(true, |at| at <= now)
    }

    /// Record a successful delivery on the given channels
    pub fn mark_sent(&mut self, channels: Vec<Channel>, now: DateTime<Utc>) {
        self.status = AlertStatus::Sent;
        self.delivery_channels = channels;
        self.failure_reason = None;
        self.scheduled_for = None;
        self.updated_at = now;
    }

    /// Record a failed delivery attempt
    pub fn mark_failed(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.status = AlertStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.updated_at = now;
    }

    /// Defer delivery until `at`; the row stays Pending so it still
    /// suppresses duplicates inside the dedup window
    pub fn defer_until(&mut self, at: DateTime<Utc>, now: DateTime<Utc>) {
        self.scheduled_for = Some(at);
        self.updated_at = now;
    }

    /// Count one more delivery attempt against the retry budget
    pub fn begin_retry(&mut self, now: DateTime<Utc>) {
        self.retry_count += 1;
        self.updated_at = now;
    }
}

#[cfg(test)]
#[path = "alert_tests.rs"]
mod tests;
