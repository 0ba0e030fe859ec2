// src/exec/mod.rs

//! Run execution: the batch scheduler, retry policy, and per-kind task
//! runner.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dag::{TaskName, TaskState};
use crate::errors::TaskError;

pub mod retry;
pub mod scheduler;
pub mod task_runner;

pub use retry::RetryPolicy;
pub use scheduler::Scheduler;

/// Terminal report for a single task in a run.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub state: TaskState,
    /// How many times the task was executed (0 for skipped tasks).
    pub attempts: u32,
    pub error: Option<TaskError>,
}

impl TaskReport {
    fn skipped() -> Self {
        Self {
            state: TaskState::Skipped,
            attempts: 0,
            error: None,
        }
    }
}

/// Outcome of a pipeline run.
#[derive(Debug)]
pub struct RunResult {
    pub run_id: u64,
    /// Wall-clock duration of the run.
    pub duration: std::time::Duration,
    /// Terminal report per task, keyed by name.
    pub reports: BTreeMap<TaskName, TaskReport>,
    /// Every independent failure, in the order it was observed.
    ///
    /// Operators see all failures from one triggering run, not only the
    /// first one encountered.
    pub failures: Vec<(TaskName, TaskError)>,
}

impl RunResult {
    /// The run is successful iff every task succeeded; any failed or
    /// skipped task marks the run as failed.
    pub fn succeeded(&self) -> bool {
        self.reports
            .values()
            .all(|report| report.state == TaskState::Succeeded)
    }

    /// The first blocking failure, if any.
    pub fn first_failure(&self) -> Option<&(TaskName, TaskError)> {
        self.failures.first()
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.reports.get(task).map(|report| report.state)
    }
}

/// Handle for cancelling a run from outside the scheduler.
///
/// Cancellation is cooperative: in-flight tasks are allowed to complete,
/// no new batch is dispatched, and remaining tasks end the run as Skipped.
/// No rollback is attempted.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Cancellation applies to the run in flight; each new run starts with a
    /// clear flag.
    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
