use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

use crate::event::{EventId, UserId};

/// What the driving loop does with a job whose fire time had already passed
/// when `schedule` was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PastDuePolicy {
    /// Dispatch on the next loop wake. Late is better than never.
    #[default]
    FireImmediately,
    /// Discard the job with a warning.
    Drop,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long before the event start the reminder fires.
    pub lead: TimeDelta,
    /// Timezone in which stored wall-clock start times are interpreted, and
    /// in which start times are rendered to the recipient.
    pub event_timezone: Tz,
    pub past_due: PastDuePolicy,
    /// Upper bound on one dispatch, on top of whatever timeout the channel
    /// applies to its own network calls.
    pub delivery_timeout: std::time::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lead: TimeDelta::minutes(15),
            event_timezone: chrono_tz::Africa::Johannesburg,
            past_due: PastDuePolicy::default(),
            delivery_timeout: std::time::Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("recipient address is empty")]
    EmptyRecipient,

    #[error("user {0} has no contact address configured")]
    NoRecipient(UserId),

    #[error("failed to look up contact address for user {user_id}")]
    DirectoryLookup {
        user_id: UserId,
        #[source]
        source: anyhow::Error,
    },

    #[error("start time {start} does not exist in timezone {timezone}")]
    UnresolvableStartTime {
        start: NaiveDateTime,
        timezone: Tz,
    },

    #[error("scheduler is stopped")]
    SchedulerStopped,
}

/// One pending one-shot reminder. A snapshot taken at scheduling time; later
/// edits to the event do not touch it until a new `schedule` call replaces it.
#[derive(Debug, Clone)]
pub struct ReminderJob {
    pub job_id: String,
    pub event_id: EventId,
    pub fire_at: DateTime<Utc>,
    pub recipient: String,
    pub title: String,
    pub start_display: DateTime<Tz>,
}

impl ReminderJob {
    pub fn job_id_for(event_id: EventId) -> String {
        format!("event_{event_id}")
    }
}
