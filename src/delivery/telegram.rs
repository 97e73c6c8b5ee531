use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use teloxide::prelude::*;

use super::{DeliveryError, Notifier};

/// Sends reminders as Telegram messages. The recipient string is the chat id
/// the user linked to their account.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(token: String) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(
        &self,
        recipient: &str,
        title: &str,
        start_display: DateTime<Tz>,
    ) -> Result<(), DeliveryError> {
        let chat_id = parse_chat_id(recipient)?;
        let text = format!(
            "🚨 {} starts at {}",
            title,
            start_display.format("%H:%M %Z")
        );

        self.bot.send_message(chat_id, text).await?;

        Ok(())
    }
}

fn parse_chat_id(recipient: &str) -> Result<ChatId, DeliveryError> {
    recipient
        .trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| DeliveryError::BadRecipient(recipient.to_owned()))
}
