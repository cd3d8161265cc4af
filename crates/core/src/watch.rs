// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch and watch pack records
//!
//! A watch is a user's standing subscription to monitor one product
//! across a set of retailers. Watch management (create/update/delete) is
//! an external API; the pipeline only bumps delivery stats on the success
//! path and soft-deactivates watches whose product has gone away.

use crate::alert::AlertKind;
use crate::product::{ProductId, RetailerId};
use crate::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a watch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchId(pub String);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WatchId {
    fn from(s: String) -> Self {
        WatchId(s)
    }
}

impl From<&str> for WatchId {
    fn from(s: &str) -> Self {
        WatchId(s.to_string())
    }
}

/// Unique identifier for a watch pack
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchPackId(pub String);

impl fmt::Display for WatchPackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WatchPackId {
    fn from(s: &str) -> Self {
        WatchPackId(s.to_string())
    }
}

/// Unique identifier for a pack subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        SubscriptionId(s.to_string())
    }
}

/// Where availability should be monitored for a watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Online,
    InStore,
    Both,
}

impl Availability {
    /// Whether this setting involves physical-store monitoring
    pub fn includes_in_store(&self) -> bool {
        matches!(self, Availability::InStore | Availability::Both)
    }
}

/// A user's standing subscription to monitor a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watch {
    pub id: WatchId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub retailer_ids: Vec<RetailerId>,
    #[serde(default)]
    pub max_price_cents: Option<u64>,
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub radius_miles: Option<u32>,
    /// Per-kind opt outs; a kind missing from the map is opted in
    #[serde(default)]
    pub alert_preferences: BTreeMap<AlertKind, bool>,
    pub is_active: bool,
    /// Confirmed successful deliveries; monotonic
    #[serde(default)]
    pub alert_count: u64,
    #[serde(default)]
    pub last_alerted: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Watch {
    pub fn new(
        id: impl Into<WatchId>,
        user_id: impl Into<UserId>,
        product_id: impl Into<ProductId>,
        retailer_ids: Vec<RetailerId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            product_id: product_id.into(),
            retailer_ids,
            max_price_cents: None,
            availability: None,
            zip_code: None,
            radius_miles: None,
            alert_preferences: BTreeMap::new(),
            is_active: true,
            alert_count: 0,
            last_alerted: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn with_zip_code(mut self, zip: impl Into<String>) -> Self {
        self.zip_code = Some(zip.into());
        self
    }

    pub fn with_radius(mut self, miles: u32) -> Self {
        self.radius_miles = Some(miles);
        self
    }

    pub fn with_max_price(mut self, cents: u64) -> Self {
        self.max_price_cents = Some(cents);
        self
    }

    /// Whether the owner wants alerts of this kind from this watch
    pub fn wants(&self, kind: AlertKind) -> bool {
        self.alert_preferences.get(&kind).copied().unwrap_or(true)
    }

    /// Record one confirmed delivery; only the orchestrator's success
    /// path calls this
    pub fn record_alert(&mut self, at: DateTime<Utc>) {
        self.alert_count += 1;
        self.last_alerted = Some(at);
        self.updated_at = at;
    }

    /// Soft-deactivate; the row stays for history
    pub fn deactivate(&mut self, at: DateTime<Utc>) {
        self.is_active = false;
        self.updated_at = at;
    }
}

/// A named group of products users subscribe to as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchPack {
    pub id: WatchPackId,
    pub name: String,
    pub product_ids: Vec<ProductId>,
    /// Should equal the count of active subscriptions; health checks
    /// report drift without correcting it
    #[serde(default)]
    pub subscriber_count: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WatchPack {
    pub fn new(
        id: impl Into<WatchPackId>,
        name: impl Into<String>,
        product_ids: Vec<ProductId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            product_ids,
            subscriber_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_subscriber_count(mut self, count: u64) -> Self {
        self.subscriber_count = count;
        self
    }
}

/// A user's membership in a watch pack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackSubscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub pack_id: WatchPackId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PackSubscription {
    pub fn new(
        id: impl Into<SubscriptionId>,
        user_id: impl Into<UserId>,
        pack_id: WatchPackId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            pack_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
