mod common;
mod fire_time;
mod hook;
mod scheduler;

#[cfg(test)]
mod test_support;

pub use common::{PastDuePolicy, ReminderJob, SchedulerConfig, SchedulingError};
pub use hook::{EventLifecycleHook, RecipientDirectory};
pub use scheduler::{RebuildReport, ReminderScheduler, ScheduleRequest};
