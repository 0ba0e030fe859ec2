// src/dag/task.rs

//! Task definitions and per-run state.

use crate::quality::QualityAssertion;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// What a task does when it runs.
///
/// A closed set: the scheduler and task runner match on this exhaustively,
/// so adding a kind is a compile-visible change.
#[derive(Debug, Clone)]
pub enum TaskKind {
    /// Always succeeds; used for the synthetic begin/end markers.
    NoOp,
    /// Bulk-load from an object storage location into a staging table.
    ///
    /// Full replace, so safe to retry.
    StageLoad {
        table: String,
        source: String,
        format: String,
    },
    /// Append rows to a fact table via a SQL template.
    ///
    /// Append-only: a retry after a partial failure may duplicate rows.
    /// Accepted limitation unless the sink exposes a transactional execute.
    FactLoad { table: String, sql: String },
    /// Load a dimension table, optionally truncating it first.
    ///
    /// With `truncate`, the load is a full replace and safe to retry;
    /// without, it appends and shares the fact-load retry caveat.
    DimensionLoad {
        table: String,
        sql: String,
        truncate: bool,
    },
    /// Run data quality assertions against the sink.
    QualityCheck { checks: Vec<QualityAssertion> },
}

impl TaskKind {
    /// Short label for logs and dry-run output.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::NoOp => "noop",
            TaskKind::StageLoad { .. } => "stage",
            TaskKind::FactLoad { .. } => "fact",
            TaskKind::DimensionLoad { .. } => "dimension",
            TaskKind::QualityCheck { .. } => "quality",
        }
    }
}

/// Immutable task definition: a node in the pipeline graph.
///
/// Per-run state lives in the scheduler, not here; the graph stays frozen
/// while a run is in flight.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub name: TaskName,
    pub kind: TaskKind,
}

impl TaskNode {
    pub fn new(name: impl Into<TaskName>, kind: TaskKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn noop(name: impl Into<TaskName>) -> Self {
        Self::new(name, TaskKind::NoOp)
    }
}

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting for its batch.
    Pending,
    /// All dependencies succeeded; about to be dispatched.
    Ready,
    /// Dispatched to the executor.
    Running,
    Succeeded,
    /// Terminal failure, retries exhausted (or a permanent error).
    Failed,
    /// Never executed because an upstream task failed or the run was
    /// cancelled.
    Skipped,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Skipped
        )
    }
}
