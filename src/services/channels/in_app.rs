use std::sync::Arc;

use async_trait::async_trait;

use crate::db::models::{
    ChannelKind, CreateInAppNotification, NotificationKind, Reminder, ScheduledEvent,
    UserPreferences,
};
use crate::db::store::NotificationStore;
use crate::error::DeliveryError;
use crate::services::dispatcher::{Channel, DeliveryPayload};

/// In-app delivery: succeeds iff the notification store write succeeds.
///
/// The created record expires at the parent event's fire time; a reminder
/// for an event that has already published is noise, and the maintenance
/// worker prunes it.
pub struct InAppChannel {
    notifications: Arc<dyn NotificationStore>,
}

impl InAppChannel {
    pub fn new(notifications: Arc<dyn NotificationStore>) -> Self {
        Self { notifications }
    }
}

#[async_trait]
impl Channel for InAppChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::InApp
    }

    async fn send(
        &self,
        reminder: &Reminder,
        event: &ScheduledEvent,
        _prefs: &UserPreferences,
    ) -> Result<(), DeliveryError> {
        let payload = DeliveryPayload::for_reminder(reminder, event);

        let notification = CreateInAppNotification {
            owner_id: reminder.owner_id.clone(),
            title: payload.title,
            message: payload.body,
            kind: NotificationKind::Reminder,
            action_url: payload.data.action_url,
            expires_at: Some(event.fire_time),
        };

        let created = self
            .notifications
            .create(notification)
            .await
            .map_err(|e| DeliveryError::Store(e.to_string()))?;

        tracing::debug!(
            "In-app notification {} created for reminder {}",
            created.id,
            reminder.id
        );
        Ok(())
    }
}
