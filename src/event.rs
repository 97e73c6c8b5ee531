//! Types crossing the seam to the surrounding CRUD backend. The backend owns
//! persistence and HTTP; the core only ever sees snapshots of these.

pub type EventId = i64;
pub type UserId = i64;

/// Snapshot of a timetable event as the CRUD layer hands it to the lifecycle
/// hook. `start_time` is the stored wall-clock time and is interpreted in the
/// configured event timezone when a reminder is scheduled.
#[derive(Debug, Clone)]
pub struct TimetableEvent {
    pub id: EventId,
    pub user_id: UserId,
    pub title: String,
    pub start_time: chrono::NaiveDateTime,
    pub end_time: chrono::NaiveDateTime,
    pub description: Option<String>,
}
