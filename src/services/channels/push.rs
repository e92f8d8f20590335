use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::PushConfig;
use crate::db::models::{ChannelKind, PermissionState, Reminder, ScheduledEvent, UserPreferences};
use crate::db::store::PermissionStore;
use crate::error::DeliveryError;
use crate::services::dispatcher::{Channel, DeliveryPayload};

/// Message shape accepted by the push gateway.
#[derive(Debug, Serialize)]
struct GatewayMessage<'a> {
    owner_id: &'a str,
    #[serde(flatten)]
    payload: &'a DeliveryPayload,
}

/// Push-style delivery through an external gateway.
///
/// Requires a prior `granted` permission for the owner and fails fast
/// otherwise; there is no automatic fallback to another channel (owners who
/// want a fallback enable multiple channels, which yields one reminder per
/// channel).
pub struct PushChannel {
    http: reqwest::Client,
    config: PushConfig,
    permissions: Arc<dyn PermissionStore>,
}

impl PushChannel {
    pub fn new(config: PushConfig, permissions: Arc<dyn PermissionStore>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
            permissions,
        }
    }
}

#[async_trait]
impl Channel for PushChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    async fn send(
        &self,
        reminder: &Reminder,
        event: &ScheduledEvent,
        _prefs: &UserPreferences,
    ) -> Result<(), DeliveryError> {
        let state = self
            .permissions
            .get(&reminder.owner_id)
            .await
            .map_err(|e| DeliveryError::Store(e.to_string()))?;

        if state != PermissionState::Granted {
            tracing::debug!(
                "Push permission for owner {} is '{}'; not attempting transmission",
                reminder.owner_id,
                state.as_str()
            );
            return Err(DeliveryError::PermissionMissing);
        }

        let Some(gateway_url) = self.config.gateway_url.as_deref() else {
            return Err(DeliveryError::ChannelUnavailable(
                "push gateway not configured".to_string(),
            ));
        };

        let payload = DeliveryPayload::for_reminder(reminder, event);
        let message = GatewayMessage {
            owner_id: &reminder.owner_id,
            payload: &payload,
        };

        let mut request = self.http.post(gateway_url).json(&message);
        if let Some(ref token) = self.config.gateway_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(format!("push gateway request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DeliveryError::Transport(format!(
                "push gateway returned {}",
                response.status()
            )));
        }

        tracing::debug!(
            "Push reminder {} delivered for owner {} (tag {})",
            reminder.id,
            reminder.owner_id,
            payload.tag
        );
        Ok(())
    }
}
