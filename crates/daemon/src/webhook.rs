// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook delivery adapter
//!
//! The one concrete transport the daemon ships: each channel maps to a
//! webhook endpoint that receives the alert as JSON. Real email/push/SMS
//! providers implement `DeliveryDispatcher` behind such an endpoint.
//! The HTTP calls are blocking (ureq) and run under `spawn_blocking`.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use sw_core::{Alert, Channel, DeliveryDispatcher, DeliveryError, DeliveryOutcome, User};
use tracing::{debug, warn};

/// Dispatcher that POSTs alerts to per-channel webhook endpoints
#[derive(Clone)]
pub struct WebhookDispatcher {
    endpoints: HashMap<Channel, String>,
}

impl WebhookDispatcher {
    /// Build from the settings map of channel code to endpoint URL;
    /// unknown channel codes are logged and skipped
    pub fn from_settings(webhooks: &BTreeMap<String, String>) -> Self {
        let mut endpoints = HashMap::new();
        for (code, url) in webhooks {
            match Channel::from_str(code) {
                Ok(channel) => {
                    endpoints.insert(channel, url.clone());
                }
                Err(error) => warn!(code = %code, error = %error, "webhook for unknown channel ignored"),
            }
        }
        Self { endpoints }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    fn payload(alert: &Alert, user: &User, channel: Channel) -> serde_json::Value {
        serde_json::json!({
            "channel": channel,
            "user_email": user.email,
            "alert": alert,
        })
    }
}

#[async_trait]
impl DeliveryDispatcher for WebhookDispatcher {
    async fn deliver(
        &self,
        alert: &Alert,
        user: &User,
        channels: &[Channel],
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let requests: Vec<(Channel, Option<String>, serde_json::Value)> = channels
            .iter()
            .map(|&channel| {
                (
                    channel,
                    self.endpoints.get(&channel).cloned(),
                    Self::payload(alert, user, channel),
                )
            })
            .collect();
        let alert_id = alert.id.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let mut successful = Vec::new();
            let mut failed = Vec::new();
            let mut last_error = None;

            for (channel, endpoint, payload) in requests {
                let Some(url) = endpoint else {
                    failed.push(channel);
                    last_error = Some(format!("no webhook configured for {}", channel));
                    continue;
                };
                match ureq::post(&url).send_json(&payload) {
                    Ok(_) => {
                        debug!(alert = %alert_id, channel = %channel, "webhook delivered");
                        successful.push(channel);
                    }
                    Err(error) => {
                        warn!(alert = %alert_id, channel = %channel, error = %error, "webhook delivery failed");
                        failed.push(channel);
                        last_error = Some(error.to_string());
                    }
                }
            }
            DeliveryOutcome::partial(successful, failed, last_error)
        })
        .await
        .map_err(|e| DeliveryError::Unavailable(e.to_string()))?;

        Ok(outcome)
    }
}
