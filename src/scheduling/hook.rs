use std::sync::Arc;

use async_trait::async_trait;

use super::common::SchedulingError;
use super::scheduler::{ReminderScheduler, ScheduleRequest};
use crate::event::{EventId, TimetableEvent, UserId};

/// Resolves a user's current contact address. Looked up on every call so an
/// address change is picked up by the next reminder; nothing is cached here.
#[async_trait]
pub trait RecipientDirectory: Send + Sync + 'static {
    async fn contact_address(&self, user_id: UserId) -> anyhow::Result<Option<String>>;
}

/// The seam the CRUD layer drives: one call per event create, one per
/// start-time-changing update, one per delete. Owns no state of its own.
pub struct EventLifecycleHook {
    scheduler: Arc<ReminderScheduler>,
    directory: Arc<dyn RecipientDirectory>,
}

impl EventLifecycleHook {
    pub fn new(
        scheduler: Arc<ReminderScheduler>,
        directory: Arc<dyn RecipientDirectory>,
    ) -> Self {
        Self {
            scheduler,
            directory,
        }
    }

    pub async fn event_created(&self, event: &TimetableEvent) -> Result<(), SchedulingError> {
        self.schedule_for(event).await
    }

    /// Re-schedules only when something the reminder carries changed; other
    /// edits (description, end time) leave the pending job alone.
    pub async fn event_updated(
        &self,
        before: &TimetableEvent,
        after: &TimetableEvent,
    ) -> Result<(), SchedulingError> {
        if before.start_time == after.start_time && before.title == after.title {
            return Ok(());
        }
        self.schedule_for(after).await
    }

    pub fn event_deleted(&self, event_id: EventId) {
        self.scheduler.cancel(event_id);
    }

    async fn schedule_for(&self, event: &TimetableEvent) -> Result<(), SchedulingError> {
        let recipient = self
            .directory
            .contact_address(event.user_id)
            .await
            .map_err(|source| SchedulingError::DirectoryLookup {
                user_id: event.user_id,
                source,
            })?
            .ok_or(SchedulingError::NoRecipient(event.user_id))?;

        self.scheduler.schedule(ScheduleRequest {
            event_id: event.id,
            title: event.title.clone(),
            start_time: event.start_time,
            recipient,
        })
    }
}
