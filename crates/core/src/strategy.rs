// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority and channel selection per alert kind
//!
//! The four alert kinds form a closed set, so dispatch is a plain match
//! rather than a plugin registry. Priorities escalate on product
//! popularity and price-drop depth; channels are the user's preference
//! order intersected with the channels that make sense for the kind.

use crate::alert::{AlertData, AlertKind, AlertPriority, Channel};
use crate::user::User;

/// Popularity score at or above which alerts escalate
const HOT_PRODUCT_POPULARITY: u32 = 80;

/// Price drop percentage that makes a price alert urgent
const MAJOR_DROP_PERCENT: f64 = 50.0;
/// Price drop percentage that raises a price alert to high
const NOTABLE_DROP_PERCENT: f64 = 25.0;

/// Compute the priority for an alert of the given kind
pub fn priority_for(kind: AlertKind, data: &AlertData, popularity: u32) -> AlertPriority {
    match kind {
        AlertKind::Restock => {
            if popularity >= HOT_PRODUCT_POPULARITY {
                AlertPriority::Urgent
            } else {
                AlertPriority::High
            }
        }
        AlertKind::PriceDrop => match data.price_drop_percent() {
            Some(percent) if percent >= MAJOR_DROP_PERCENT => AlertPriority::Urgent,
            Some(percent) if percent >= NOTABLE_DROP_PERCENT => AlertPriority::High,
            _ => AlertPriority::Medium,
        },
        AlertKind::LowStock => {
            if popularity >= HOT_PRODUCT_POPULARITY {
                AlertPriority::High
            } else {
                AlertPriority::Medium
            }
        }
        AlertKind::PreOrder => {
            if popularity >= HOT_PRODUCT_POPULARITY {
                AlertPriority::High
            } else {
                AlertPriority::Medium
            }
        }
    }
}

/// Channels that make sense for a given alert kind
///
/// Restocks sell out in minutes, so every channel applies. Price drops
/// and pre-orders are not time-critical enough for SMS. Low stock is a
/// short heads-up and skips the long-form channels.
pub fn supported_channels(kind: AlertKind) -> &'static [Channel] {
    match kind {
        AlertKind::Restock => &[
            Channel::WebPush,
            Channel::Email,
            Channel::Sms,
            Channel::Discord,
        ],
        AlertKind::PriceDrop => &[Channel::WebPush, Channel::Email, Channel::Discord],
        AlertKind::LowStock => &[Channel::WebPush, Channel::Sms],
        AlertKind::PreOrder => &[Channel::WebPush, Channel::Email, Channel::Discord],
    }
}

/// The user's preference order filtered to the kind's supported channels
pub fn channels_for(kind: AlertKind, user: &User) -> Vec<Channel> {
    let supported = supported_channels(kind);
    user.channels
        .iter()
        .copied()
        .filter(|channel| supported.contains(channel))
        .collect()
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;
