use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::EmailConfig;
use crate::db::models::{ChannelKind, Reminder, ScheduledEvent, UserPreferences};
use crate::error::DeliveryError;
use crate::services::dispatcher::{Channel, DeliveryPayload};

/// Email delivery over SMTP. Fire-and-forget from the engine's perspective:
/// one transport attempt, one success/failure outcome, no retries.
pub struct EmailChannel {
    config: EmailConfig,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(
        &self,
        reminder: &Reminder,
        event: &ScheduledEvent,
        prefs: &UserPreferences,
    ) -> Result<(), DeliveryError> {
        let Some(smtp_host) = self.config.smtp_host.as_deref() else {
            return Err(DeliveryError::ChannelUnavailable(
                "SMTP not configured".to_string(),
            ));
        };

        let Some(to_address) = prefs.email_address.as_deref() else {
            return Err(DeliveryError::ChannelUnavailable(format!(
                "owner {} has no email address on file",
                reminder.owner_id
            )));
        };

        let payload = DeliveryPayload::for_reminder(reminder, event);
        let mut body = format!("{}\n\nScheduled for {} UTC.", payload.body, event.fire_time);
        if let Some(ref url) = event.target_url {
            body.push_str(&format!("\n\n{}", url));
        }

        let email = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| DeliveryError::Transport(format!("bad from address: {}", e)))?,
            )
            .to(to_address
                .parse()
                .map_err(|e| DeliveryError::Transport(format!("bad recipient address: {}", e)))?)
            .subject(payload.title)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| DeliveryError::Transport(format!("failed to build email: {}", e)))?;

        let mut transport_builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
            .map_err(|e| DeliveryError::Transport(format!("SMTP relay setup failed: {}", e)))?
            .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer
            .send(email)
            .await
            .map_err(|e| DeliveryError::Transport(format!("SMTP send failed: {}", e)))?;

        tracing::debug!(
            "Reminder {} emailed to owner {} ({})",
            reminder.id,
            reminder.owner_id,
            to_address
        );
        Ok(())
    }
}
