use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::models::{ChannelKind, Reminder, ScheduledEvent, UserPreferences};
use crate::error::DeliveryError;

/// The payload a delivery channel presents to the owner.
///
/// `tag` is the dedup key: platforms that re-show notifications collapse
/// entries sharing a tag, so one reminder never surfaces twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPayload {
    pub title: String,
    pub body: String,
    pub tag: String,
    pub require_interaction: bool,
    pub data: PayloadData,
}

/// Typed action data carried with a delivered notification. Activating the
/// notification resolves `action_url` on the consumer side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadData {
    pub action_url: Option<String>,
    pub reminder_id: String,
    pub event_id: String,
}

impl DeliveryPayload {
    pub fn for_reminder(reminder: &Reminder, event: &ScheduledEvent) -> Self {
        let title = format!("Upcoming: {}", event.title);
        let body = if reminder.lead_time_minutes >= 60 && reminder.lead_time_minutes % 60 == 0 {
            let hours = reminder.lead_time_minutes / 60;
            format!("Publishing in {} hour(s). {}", hours, event.body)
        } else {
            format!(
                "Publishing in {} minute(s). {}",
                reminder.lead_time_minutes, event.body
            )
        };

        Self {
            title,
            body: body.trim_end().to_string(),
            tag: reminder.dedup_tag(),
            require_interaction: false,
            data: PayloadData {
                action_url: event.target_url.clone(),
                reminder_id: reminder.id.clone(),
                event_id: event.id.clone(),
            },
        }
    }
}

/// A delivery mechanism. Implementations are independently swappable and
/// testable behind this one contract; the dispatcher routes to them purely
/// by the reminder's channel field.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    fn kind(&self) -> ChannelKind;

    async fn send(
        &self,
        reminder: &Reminder,
        event: &ScheduledEvent,
        prefs: &UserPreferences,
    ) -> Result<(), DeliveryError>;
}

/// Routes a reminder to the channel implementation registered for its
/// channel field. Contains no channel-specific logic.
pub struct ChannelDispatcher {
    channels: HashMap<ChannelKind, Arc<dyn Channel>>,
}

impl ChannelDispatcher {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    pub fn register(mut self, channel: Arc<dyn Channel>) -> Self {
        self.channels.insert(channel.kind(), channel);
        self
    }

    pub async fn dispatch(
        &self,
        reminder: &Reminder,
        event: &ScheduledEvent,
        prefs: &UserPreferences,
    ) -> Result<(), DeliveryError> {
        let kind = reminder
            .channel_kind()
            .ok_or_else(|| DeliveryError::ChannelUnavailable(reminder.channel.clone()))?;

        let channel = self
            .channels
            .get(&kind)
            .ok_or_else(|| DeliveryError::ChannelUnavailable(kind.as_str().to_string()))?;

        channel.send(reminder, event, prefs).await
    }
}

impl Default for ChannelDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
