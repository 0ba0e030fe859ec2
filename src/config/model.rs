// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::TaskKind;
use crate::errors::{PipelineError, Result};
use crate::exec::RetryPolicy;
use crate::quality::QualityAssertion;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [pipeline]
/// owner = "june"
/// max_retries = 3
/// retry_delay_secs = 300
///
/// [task.begin]
/// kind = "noop"
///
/// [task.stage_events]
/// kind = "stage"
/// after = ["begin"]
/// table = "staging_events"
/// source = "s3://udacity-dend/log_data"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global pipeline settings from `[pipeline]`.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration. Construct via `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub pipeline: PipelineSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    /// Wrap already-validated sections. Only `config::validate` should call
    /// this.
    pub fn new_unchecked(
        pipeline: PipelineSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self { pipeline, task }
    }
}

/// `[pipeline]` section: global defaults that would otherwise live in
/// process-wide state.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Owner recorded in run logs.
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Retries after the initial attempt, for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Informational cron expression; the run trigger surface is external
    /// and responsible for honouring it.
    #[serde(default)]
    pub schedule: Option<String>,
}

fn default_owner() -> String {
    "pipeline".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    300
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            owner: default_owner(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            schedule: None,
        }
    }
}

impl PipelineSection {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

/// Task kind as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKindName {
    Noop,
    Stage,
    Fact,
    Dimension,
    Quality,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub kind: TaskKindName,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Destination table (stage, fact, dimension).
    #[serde(default)]
    pub table: Option<String>,

    /// Object storage location to stage from (stage only).
    #[serde(default)]
    pub source: Option<String>,

    /// Format hint passed to the sink's bulk load (stage only).
    #[serde(default = "default_format")]
    pub format: String,

    /// Insert statement (fact and dimension).
    #[serde(default)]
    pub sql: Option<String>,

    /// Clear the destination before loading (dimension only).
    #[serde(default)]
    pub truncate: bool,

    /// Tables whose row counts the quality gate verifies (quality only).
    #[serde(default)]
    pub tables: Vec<String>,
}

fn default_format() -> String {
    "json".to_string()
}

impl TaskConfig {
    /// Resolve this section into a concrete [`TaskKind`], checking that the
    /// fields the kind requires are present.
    pub fn to_kind(&self) -> Result<TaskKind> {
        match self.kind {
            TaskKindName::Noop => Ok(TaskKind::NoOp),

            TaskKindName::Stage => {
                let table = self.require("table", &self.table)?;
                let source = self.require("source", &self.source)?;
                Ok(TaskKind::StageLoad {
                    table,
                    source,
                    format: self.format.clone(),
                })
            }

            TaskKindName::Fact => {
                let table = self.require("table", &self.table)?;
                let sql = self.require("sql", &self.sql)?;
                Ok(TaskKind::FactLoad { table, sql })
            }

            TaskKindName::Dimension => {
                let table = self.require("table", &self.table)?;
                let sql = self.require("sql", &self.sql)?;
                Ok(TaskKind::DimensionLoad {
                    table,
                    sql,
                    truncate: self.truncate,
                })
            }

            TaskKindName::Quality => {
                if self.tables.is_empty() {
                    return Err(PipelineError::ConfigError(
                        "quality task requires a non-empty `tables` list".to_string(),
                    ));
                }
                let checks = self
                    .tables
                    .iter()
                    .map(QualityAssertion::row_count)
                    .collect();
                Ok(TaskKind::QualityCheck { checks })
            }
        }
    }

    fn require(&self, field: &str, value: &Option<String>) -> Result<String> {
        value.clone().ok_or_else(|| {
            PipelineError::ConfigError(format!(
                "{} task requires `{}`",
                kind_name(self.kind),
                field
            ))
        })
    }
}

fn kind_name(kind: TaskKindName) -> &'static str {
    match kind {
        TaskKindName::Noop => "noop",
        TaskKindName::Stage => "stage",
        TaskKindName::Fact => "fact",
        TaskKindName::Dimension => "dimension",
        TaskKindName::Quality => "quality",
    }
}
