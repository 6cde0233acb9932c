//! In-memory time tracking for tasks.
//!
//! # Design
//! The backend's task table has no columns for timer state, so sessions are
//! tracked here, keyed by task id. Each task is a two-state machine: idle (no
//! active timer) and running. `start_timer` and `stop_timer` are the only
//! transitions and each fails, leaving state untouched, when called in the
//! wrong state.
//!
//! All task states sit behind one mutex so the check-then-set of a
//! transition is atomic. Log ids come from a single counter shared by every
//! task; it is bumped while the state lock is held, so each task's logs are
//! appended in increasing id order.
//!
//! Reads never write: `attach` and `time_logs` on an unknown task return the
//! zero value without storing it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{SeedError, TimerError};
use crate::types::RecordId;

/// First id handed out to a time log.
pub const FIRST_LOG_ID: u64 = 100;

/// Tracking state of one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTrackingState {
    /// Milliseconds across all completed sessions.
    pub total_time: u64,
    pub active_timer: Option<ActiveTimer>,
    /// Completed sessions in stop order.
    pub time_logs: Vec<TimeLog>,
}

impl TimeTrackingState {
    pub fn is_running(&self) -> bool {
        self.active_timer.is_some()
    }

    /// Sum of the log durations, `None` on overflow.
    fn logged_total(&self) -> Option<u64> {
        self.time_logs
            .iter()
            .try_fold(0u64, |total, log| total.checked_add(log.duration))
    }
}

/// An in-progress session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTimer {
    #[serde(alias = "Id")]
    pub task_id: RecordId,
    pub start_time: DateTime<Utc>,
}

/// One completed session. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLog {
    #[serde(alias = "Id")]
    pub id: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// `end_time - start_time` in milliseconds.
    pub duration: u64,
    /// Calendar date of `start_time`.
    pub date: NaiveDate,
}

/// Owner of every task's tracking state.
pub struct TimeTracker {
    states: Mutex<HashMap<RecordId, TimeTrackingState>>,
    next_log_id: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl Default for TimeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeTracker")
            .field("states", &*self.lock())
            .field("next_log_id", &self.next_log_id.load(Ordering::SeqCst))
            .field("clock", &self.clock)
            .finish()
    }
}

impl TimeTracker {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            next_log_id: AtomicU64::new(FIRST_LOG_ID),
            clock,
        }
    }

    // Every check precedes every write, so a poisoned lock still guards
    // consistent state.
    fn lock(&self) -> MutexGuard<'_, HashMap<RecordId, TimeTrackingState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset `task_id` to the zero state. Called once the backend has
    /// confirmed a new task; a reused id loses whatever it had before.
    pub fn initialize_state(&self, task_id: RecordId) {
        self.lock().insert(task_id, TimeTrackingState::default());
    }

    /// Copy of the task's state, or the zero state if it has none.
    pub fn attach(&self, task_id: RecordId) -> TimeTrackingState {
        self.lock().get(&task_id).cloned().unwrap_or_default()
    }

    pub fn start_timer(&self, task_id: RecordId) -> Result<ActiveTimer, TimerError> {
        let mut states = self.lock();
        if states.get(&task_id).is_some_and(TimeTrackingState::is_running) {
            return Err(TimerError::Conflict { task_id });
        }

        let timer = ActiveTimer {
            task_id,
            start_time: self.clock.now(),
        };
        states.entry(task_id).or_default().active_timer = Some(timer.clone());
        debug!(task_id, start_time = %timer.start_time, "timer started");
        Ok(timer)
    }

    pub fn stop_timer(&self, task_id: RecordId) -> Result<TimeLog, TimerError> {
        let mut states = self.lock();
        let Some(state) = states.get_mut(&task_id) else {
            return Err(TimerError::NotFound { task_id });
        };
        let Some(timer) = state.active_timer.take() else {
            return Err(TimerError::NotFound { task_id });
        };

        let end_time = self.clock.now();
        let duration = u64::try_from((end_time - timer.start_time).num_milliseconds()).unwrap_or(0);
        let log = TimeLog {
            id: self.next_log_id.fetch_add(1, Ordering::SeqCst),
            start_time: timer.start_time,
            end_time,
            duration,
            date: timer.start_time.date_naive(),
        };

        state.time_logs.push(log.clone());
        state.total_time += duration;
        debug!(task_id, log_id = log.id, duration, "timer stopped");
        Ok(log)
    }

    /// Completed sessions for the task, oldest first.
    pub fn time_logs(&self, task_id: RecordId) -> Vec<TimeLog> {
        self.lock()
            .get(&task_id)
            .map(|state| state.time_logs.clone())
            .unwrap_or_default()
    }

    /// Drop everything tracked for the task.
    pub fn discard(&self, task_id: RecordId) {
        if self.lock().remove(&task_id).is_some() {
            debug!(task_id, "tracking state discarded");
        }
    }

    /// Install previously recorded state, replacing whatever those tasks had.
    ///
    /// Each log's `duration` and `date` are recomputed from its timestamps,
    /// and `total_time` from the logs; seeded values that disagree are
    /// replaced. A log that ends before it starts, an active timer filed
    /// under another task, or a total or log id at the top of the `u64`
    /// range rejects the whole seed and leaves the tracker untouched. The
    /// log id counter moves past the highest seeded id.
    pub fn seed(
        &self,
        seeded: impl IntoIterator<Item = (RecordId, TimeTrackingState)>,
    ) -> Result<(), SeedError> {
        let seeded = seeded
            .into_iter()
            .map(|(task_id, state)| normalize_seed(task_id, state).map(|state| (task_id, state)))
            .collect::<Result<Vec<_>, _>>()?;
        let next_log_id = seeded
            .iter()
            .flat_map(|(_, state)| &state.time_logs)
            .map(|log| log.id)
            .max()
            .map(|log_id| log_id.checked_add(1).ok_or(SeedError::LogIdExhausted { log_id }))
            .transpose()?;

        let mut states = self.lock();
        if let Some(next_log_id) = next_log_id {
            self.next_log_id.fetch_max(next_log_id, Ordering::SeqCst);
        }
        states.extend(seeded);
        Ok(())
    }

    /// Seed from an array of task records, each optionally carrying a
    /// `timeTracking` object. Every other field is ignored.
    pub fn seed_from_json(&self, json: &str) -> Result<usize, SeedError> {
        let records: Vec<SeedRecord> = serde_json::from_str(json)?;
        let seeded: Vec<_> = records
            .into_iter()
            .filter_map(|record| record.time_tracking.map(|state| (record.id, state)))
            .collect();
        let count = seeded.len();
        self.seed(seeded)?;
        Ok(count)
    }
}

/// Bring one seeded state in line with the tracker's invariants.
fn normalize_seed(task_id: RecordId, mut state: TimeTrackingState) -> Result<TimeTrackingState, SeedError> {
    if let Some(timer) = &state.active_timer {
        if timer.task_id != task_id {
            return Err(SeedError::ForeignTimer {
                task_id,
                timer_task_id: timer.task_id,
            });
        }
    }

    for log in &mut state.time_logs {
        let duration = u64::try_from((log.end_time - log.start_time).num_milliseconds())
            .map_err(|_| SeedError::NegativeDuration { task_id, log_id: log.id })?;
        let date = log.start_time.date_naive();
        if log.duration != duration || log.date != date {
            warn!(
                task_id,
                log_id = log.id,
                seeded_duration = log.duration,
                duration,
                seeded_date = %log.date,
                %date,
                "seeded log disagrees with its timestamps"
            );
            log.duration = duration;
            log.date = date;
        }
    }

    let logged = state.logged_total().ok_or(SeedError::TotalOverflow { task_id })?;
    if state.total_time != logged {
        warn!(task_id, seeded = state.total_time, logged, "seeded total disagrees with logs");
        state.total_time = logged;
    }
    Ok(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedRecord {
    #[serde(rename = "Id")]
    id: RecordId,
    time_tracking: Option<TimeTrackingState>,
}
