mod mail;
mod telegram;

pub use mail::MailApiNotifier;
pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery timed out")]
    Timeout,

    #[error("mail API rejected the message. [status = {status}, body = {body}]")]
    Api { status: u16, body: String },

    #[error(transparent)]
    Transport(reqwest::Error),

    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error("recipient is not valid for this channel. [recipient = {0}]")]
    BadRecipient(String),
}

/// One reminder message to one recipient over one fixed channel.
///
/// The scheduler only ever talks to this trait; swapping the concrete channel
/// is a configuration change, never a scheduler change. Implementations must
/// bound their outbound network calls so a slow channel cannot hold a
/// dispatch task forever, and must report a malformed recipient as
/// `DeliveryError::BadRecipient` instead of panicking.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(
        &self,
        recipient: &str,
        title: &str,
        start_display: DateTime<Tz>,
    ) -> Result<(), DeliveryError>;
}
