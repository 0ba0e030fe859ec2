// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::quality::QualityViolation;
use crate::sink::SinkError;

/// Structural and run-level errors.
///
/// These abort before (or instead of) a run; per-task failures during a run
/// are [`TaskError`]s and are recorded in the run result instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),

    #[error("Unknown task referenced by edge: {0}")]
    UnknownTask(String),

    #[error("Cycle detected in task DAG: {0}")]
    DagCycle(String),

    #[error("a run is already active for this pipeline")]
    ConcurrentRun,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure of a single task inside a run.
///
/// Caught at the scheduler boundary and aggregated into the run result; a
/// task failure never terminates the process.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Quality(#[from] QualityViolation),
}

impl TaskError {
    /// Whether this failure is worth retrying.
    ///
    /// Only transient sink errors are; permanent sink errors and quality
    /// violations fail the task on the spot.
    pub fn is_transient(&self) -> bool {
        match self {
            TaskError::Sink(e) => e.is_transient(),
            TaskError::Quality(_) => false,
        }
    }
}
