use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{NaiveDateTime, TimeDelta, Utc};
use tokio::{sync::Notify, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

use super::common::{PastDuePolicy, ReminderJob, SchedulerConfig, SchedulingError};
use super::fire_time;
use crate::{delivery::Notifier, event::EventId};

const REGISTRY_LOCK: &str = "reminder registry lock is never poisoned";
const LOOP_TASK_LOCK: &str = "loop task lock is never poisoned";

/// Input to `schedule`: the event snapshot plus the contact address the
/// lifecycle hook resolved at call time.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub event_id: EventId,
    pub title: String,
    pub start_time: NaiveDateTime,
    pub recipient: String,
}

#[derive(Debug, Default)]
pub struct RebuildReport {
    pub scheduled: usize,
    pub rejected: Vec<(EventId, SchedulingError)>,
}

struct QueuedJob {
    job: ReminderJob,
    /// Fire time was already past at scheduling time; subject to the
    /// configured past-due policy when the loop picks it up.
    late: bool,
}

/// Pending jobs, ordered by deadline for the driving loop and indexed by
/// event id for replace/cancel. One entry per event id at all times.
#[derive(Default)]
struct Registry {
    by_event: HashMap<EventId, Instant>,
    queue: BTreeMap<(Instant, EventId), QueuedJob>,
}

impl Registry {
    fn insert(&mut self, deadline: Instant, queued: QueuedJob) -> bool {
        let event_id = queued.job.event_id;
        let replaced = self.remove(event_id);
        self.by_event.insert(event_id, deadline);
        self.queue.insert((deadline, event_id), queued);
        replaced
    }

    fn remove(&mut self, event_id: EventId) -> bool {
        match self.by_event.remove(&event_id) {
            Some(deadline) => {
                self.queue.remove(&(deadline, event_id));
                true
            }
            None => false,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    fn pop_due(&mut self, now: Instant) -> Vec<QueuedJob> {
        let mut due = Vec::new();
        while let Some((&(deadline, event_id), _)) = self.queue.first_key_value() {
            if deadline > now {
                break;
            }
            let queued = self
                .queue
                .remove(&(deadline, event_id))
                .expect("key observed under the same lock");
            self.by_event.remove(&event_id);
            due.push(queued);
        }
        due
    }

    fn drain(&mut self) -> Vec<ReminderJob> {
        self.by_event.clear();
        std::mem::take(&mut self.queue)
            .into_values()
            .map(|queued| queued.job)
            .collect()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

struct SchedulerInner {
    config: SchedulerConfig,
    notifier: Arc<dyn Notifier>,
    registry: Mutex<Registry>,
    wake: Notify,
    shutdown: CancellationToken,
    stopped: AtomicBool,
}

/// Owns the pending reminder set and the single driving loop that fires jobs.
///
/// `schedule` and `cancel` only mutate the registry and wake the loop; any
/// network I/O happens in a per-job dispatch task, off the loop and off the
/// registry lock. Delivery is at-most-once and best-effort: a failed dispatch
/// is logged and the job stays consumed.
pub struct ReminderScheduler {
    inner: Arc<SchedulerInner>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl ReminderScheduler {
    pub fn new(config: SchedulerConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                notifier,
                registry: Mutex::new(Registry::default()),
                wake: Notify::new(),
                shutdown: CancellationToken::new(),
                stopped: AtomicBool::new(false),
            }),
            loop_task: Mutex::new(None),
        }
    }

    /// Spawns the driving loop. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut slot = self.loop_task.lock().expect(LOOP_TASK_LOCK);
        if slot.is_some() {
            log::warn!("Scheduler loop is already running");
            return;
        }

        let inner = Arc::clone(&self.inner);
        *slot = Some(tokio::spawn(run_loop(inner)));
        log::info!("Reminder scheduler started");
    }

    /// Registers (or replaces) the reminder for one event. Returns before any
    /// network call happens.
    pub fn schedule(&self, request: ScheduleRequest) -> Result<(), SchedulingError> {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return Err(SchedulingError::SchedulerStopped);
        }

        let recipient = request.recipient.trim();
        if recipient.is_empty() {
            return Err(SchedulingError::EmptyRecipient);
        }

        let config = &self.inner.config;
        let start_utc = fire_time::resolve_start(request.start_time, config.event_timezone)?;
        let fire_at = start_utc - config.lead;

        let delta = fire_at - Utc::now();
        let late = delta <= TimeDelta::zero();
        let deadline = if late {
            Instant::now()
        } else {
            Instant::now() + delta.to_std().expect("delta is positive")
        };

        let job = ReminderJob {
            job_id: ReminderJob::job_id_for(request.event_id),
            event_id: request.event_id,
            fire_at,
            recipient: recipient.to_owned(),
            title: request.title,
            start_display: start_utc.with_timezone(&config.event_timezone),
        };

        let replaced = self
            .inner
            .registry
            .lock()
            .expect(REGISTRY_LOCK)
            .insert(deadline, QueuedJob { job, late });

        if replaced {
            log::info!(
                "Replaced pending reminder. [event_id = {}, fire_at = {}]",
                request.event_id,
                fire_at
            );
        } else {
            log::info!(
                "Scheduled reminder. [event_id = {}, fire_at = {}]",
                request.event_id,
                fire_at
            );
        }

        self.inner.wake.notify_one();
        Ok(())
    }

    /// Removes any pending reminder for the event. No-op if there is none or
    /// if the job is already dispatching; a dispatch that has started cannot
    /// be unsent.
    pub fn cancel(&self, event_id: EventId) {
        let removed = self
            .inner
            .registry
            .lock()
            .expect(REGISTRY_LOCK)
            .remove(event_id);

        if removed {
            log::info!("Cancelled pending reminder. [event_id = {event_id}]");
            self.inner.wake.notify_one();
        } else {
            log::debug!("Cancel had no pending reminder. [event_id = {event_id}]");
        }
    }

    /// Bulk-schedules future events at startup, typically fed by the host's
    /// event-store query. Invalid entries are skipped and reported, never
    /// abort the rest.
    pub fn rebuild(&self, events: impl IntoIterator<Item = ScheduleRequest>) -> RebuildReport {
        let mut report = RebuildReport::default();
        for request in events {
            let event_id = request.event_id;
            match self.schedule(request) {
                Ok(()) => report.scheduled += 1,
                Err(err) => {
                    log::warn!("Skipping event during rebuild. [event_id = {event_id}, cause = {err}]");
                    report.rejected.push((event_id, err));
                }
            }
        }

        log::info!(
            "Rebuilt reminder schedule. [scheduled = {}, rejected = {}]",
            report.scheduled,
            report.rejected.len()
        );
        report
    }

    pub fn pending_count(&self) -> usize {
        self.inner.registry.lock().expect(REGISTRY_LOCK).len()
    }

    /// Stops the driving loop and returns every job that never fired, so the
    /// caller can tell "fired" apart from "dropped at shutdown". In-flight
    /// dispatches are left to finish on their own.
    pub async fn stop(&self) -> Vec<ReminderJob> {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.shutdown.cancel();

        let task = self.loop_task.lock().expect(LOOP_TASK_LOCK).take();
        if let Some(task) = task {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), task).await;
        }

        let mut unfired = self.inner.registry.lock().expect(REGISTRY_LOCK).drain();
        unfired.sort_by_key(|job| job.fire_at);

        if !unfired.is_empty() {
            log::warn!(
                "Scheduler stopped with {} reminders that never fired",
                unfired.len()
            );
        }
        unfired
    }
}

async fn run_loop(inner: Arc<SchedulerInner>) {
    loop {
        let next = inner.registry.lock().expect(REGISTRY_LOCK).next_deadline();

        tokio::select! {
            _ = inner.shutdown.cancelled() => {
                log::info!("Scheduler loop shutting down");
                break;
            }
            _ = inner.wake.notified() => {
                // Registry changed; recompute the nearest deadline.
            }
            _ = sleep_until_next(next) => {
                dispatch_due(&inner);
            }
        }
    }
}

async fn sleep_until_next(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn dispatch_due(inner: &Arc<SchedulerInner>) {
    let due = inner
        .registry
        .lock()
        .expect(REGISTRY_LOCK)
        .pop_due(Instant::now());

    for queued in due {
        if queued.late && inner.config.past_due == PastDuePolicy::Drop {
            log::warn!(
                "Dropping reminder scheduled after its fire time. [job_id = {}, fire_at = {}]",
                queued.job.job_id,
                queued.job.fire_at
            );
            continue;
        }
        dispatch(inner, queued.job);
    }
}

/// Hands one fired job to the notifier in its own task. Errors and timeouts
/// end here: logged, never retried, never visible to the loop.
fn dispatch(inner: &Arc<SchedulerInner>, job: ReminderJob) {
    let notifier = Arc::clone(&inner.notifier);
    let delivery_timeout = inner.config.delivery_timeout;

    tokio::spawn(async move {
        log::info!(
            "Dispatching reminder. [job_id = {}, recipient = {}]",
            job.job_id,
            job.recipient
        );

        let send = notifier.notify(&job.recipient, &job.title, job.start_display);
        match tokio::time::timeout(delivery_timeout, send).await {
            Ok(Ok(())) => {
                log::info!("Reminder delivered. [job_id = {}]", job.job_id);
            }
            Ok(Err(err)) => {
                log::error!(
                    "Reminder delivery failed. [job_id = {}, recipient = {}, cause = {}]",
                    job.job_id,
                    job.recipient,
                    err
                );
            }
            Err(_) => {
                log::error!(
                    "Reminder delivery timed out. [job_id = {}, recipient = {}, timeout = {:?}]",
                    job.job_id,
                    job.recipient,
                    delivery_timeout
                );
            }
        }
    });
}
