use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;

use crate::delivery::{DeliveryError, Notifier};

#[derive(Debug, Clone, PartialEq)]
pub struct SentReminder {
    pub recipient: String,
    pub title: String,
    pub start_display: DateTime<Tz>,
}

/// Notifier that records every dispatch it receives. `failing()` makes every
/// delivery report an error after recording the attempt.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentReminder>>>,
    fail_all: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentReminder> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        recipient: &str,
        title: &str,
        start_display: DateTime<Tz>,
    ) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(SentReminder {
            recipient: recipient.to_owned(),
            title: title.to_owned(),
            start_display,
        });

        if self.fail_all {
            return Err(DeliveryError::Api {
                status: 500,
                body: "mail API is down".to_owned(),
            });
        }
        Ok(())
    }
}
