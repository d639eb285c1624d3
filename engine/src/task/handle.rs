// SPDX-License-Identifier: AGPL-3.0-only

//! Task record shared by the dispatch worker and every handle.
//!
//! The record is the only channel between the two sides: the worker moves
//! it `Queued → Running → Completed | Failed` and notifies the condvar;
//! handles read snapshots or block on the condvar.

use crate::error::EngineError;
use crate::precision::Precision;
use crate::task::results::TaskResults;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Lifecycle of a submitted task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Queued,
    Running,
    Completed(Arc<TaskResults>),
    Failed(EngineError),
}

impl TaskState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

#[derive(Debug)]
pub(crate) struct TaskRecord {
    id: u64,
    device: String,
    precision: Precision,
    total_slots: u64,
    completed_slots: AtomicU64,
    submitted: Instant,
    state: Mutex<TaskState>,
    finished: Condvar,
}

impl TaskRecord {
    pub(crate) fn new(id: u64, device: String, precision: Precision, total_slots: u64) -> Self {
        Self {
            id,
            device,
            precision,
            total_slots,
            completed_slots: AtomicU64::new(0),
            submitted: Instant::now(),
            state: Mutex::new(TaskState::Queued),
            finished: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) const fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn set_running(&self) {
        *self.lock() = TaskState::Running;
    }

    pub(crate) fn completed(&self) -> u64 {
        self.completed_slots.load(Ordering::Relaxed)
    }

    /// Count `n` solved slots.
    pub(crate) fn advance(&self, n: u64) {
        self.completed_slots.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn finish(&self, outcome: Result<TaskResults, EngineError>) {
        let mut state = self.lock();
        *state = match outcome {
            Ok(results) => TaskState::Completed(Arc::new(results)),
            Err(e) => TaskState::Failed(e),
        };
        drop(state);
        self.finished.notify_all();
    }
}

/// Caller-side proxy of a submitted task. Cheap to clone; dropping it does
/// not affect the task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    record: Arc<TaskRecord>,
}

impl TaskHandle {
    pub(crate) const fn new(record: Arc<TaskRecord>) -> Self {
        Self { record }
    }

    /// Per-interface submission number.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.record.id
    }

    #[must_use]
    pub fn precision(&self) -> Precision {
        self.record.precision
    }

    #[must_use]
    pub fn state(&self) -> TaskState {
        self.record.lock().clone()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.record.lock().is_terminal()
    }

    /// (solved, total) slots.
    #[must_use]
    pub fn progress(&self) -> (u64, u64) {
        (self.record.completed(), self.record.total_slots)
    }

    #[must_use]
    pub fn results(&self) -> Option<Arc<TaskResults>> {
        match &*self.record.lock() {
            TaskState::Completed(results) => Some(Arc::clone(results)),
            _ => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<EngineError> {
        match &*self.record.lock() {
            TaskState::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// One-line human-readable status. Never blocks on the task.
    #[must_use]
    pub fn get_status_message(&self) -> String {
        let id = self.record.id;
        match &*self.record.lock() {
            TaskState::Queued => format!(
                "Task {id} queued on {} ({}, {:.2?} ago)",
                self.record.device,
                self.record.precision,
                self.record.submitted.elapsed()
            ),
            TaskState::Running => {
                let (done, total) = self.progress();
                #[allow(clippy::cast_precision_loss)]
                let pct = if total == 0 {
                    100.0
                } else {
                    100.0 * done as f64 / total as f64
                };
                format!("Task {id} running: {done}/{total} slots ({pct:.1}%)")
            }
            TaskState::Completed(results) => format!(
                "Task {id} completed: {} levels from {} potentials on {} in {:.1} ms",
                results.level_count(),
                results.potentials.len(),
                results.device,
                results.wall_time_ms
            ),
            TaskState::Failed(e) => format!("Task {id} failed: {e}"),
        }
    }

    /// Block until the task is terminal, or until `timeout` elapses. A
    /// timeout past the clock's range waits without a deadline.
    ///
    /// # Errors
    ///
    /// The task's own failure, or [`EngineError::Timeout`].
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Arc<TaskResults>, EngineError> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t).map(|at| (t, at)));
        let mut state = self.record.lock();
        loop {
            match &*state {
                TaskState::Completed(results) => return Ok(Arc::clone(results)),
                TaskState::Failed(e) => return Err(e.clone()),
                TaskState::Queued | TaskState::Running => {}
            }
            state = match deadline {
                None => self
                    .record
                    .finished
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some((requested, at)) => {
                    let now = Instant::now();
                    if now >= at {
                        return Err(EngineError::Timeout(requested));
                    }
                    self.record
                        .finished
                        .wait_timeout(state, at - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}
