use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{DeliveryError, Notifier};
use crate::settings::MailSettings;

/// Sends reminders through a transactional-email HTTP API.
pub struct MailApiNotifier {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct SendMailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

impl MailApiNotifier {
    pub fn new(settings: &MailSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            from: settings.from.clone(),
        })
    }
}

#[async_trait]
impl Notifier for MailApiNotifier {
    async fn notify(
        &self,
        recipient: &str,
        title: &str,
        start_display: DateTime<Tz>,
    ) -> Result<(), DeliveryError> {
        let request = SendMailRequest {
            from: &self.from,
            to: recipient,
            subject: "⏰ Event Reminder",
            text: reminder_body(title, start_display),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

fn map_transport(err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        DeliveryError::Timeout
    } else {
        DeliveryError::Transport(err)
    }
}

fn reminder_body(title: &str, start_display: DateTime<Tz>) -> String {
    format!(
        "Hi 👋\n\n\
         This is a reminder that your event is starting soon.\n\n\
         📌 Event: {}\n\
         🕒 Starts at: {}\n\n\
         Good luck!",
        title,
        start_display.format("%Y-%m-%d %H:%M %Z")
    )
}
