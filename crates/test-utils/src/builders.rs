#![allow(dead_code)]

use std::collections::BTreeMap;
use loaddag::config::{ConfigFile, PipelineSection, RawConfigFile, TaskConfig, TaskKindName};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                pipeline: PipelineSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.config.pipeline.max_retries = retries;
        self
    }

    pub fn with_retry_delay_secs(mut self, secs: u64) -> Self {
        self.config.pipeline.retry_delay_secs = secs;
        self
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.config.pipeline.owner = owner.to_string();
        self
    }

    /// Build, panicking on an invalid configuration.
    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// Build, returning validation errors (for negative tests).
    pub fn try_build(self) -> loaddag::errors::Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(kind: TaskKindName) -> Self {
        Self {
            task: TaskConfig {
                kind,
                after: vec![],
                table: None,
                source: None,
                format: "json".to_string(),
                sql: None,
                truncate: false,
                tables: vec![],
            },
        }
    }

    pub fn noop() -> Self {
        Self::new(TaskKindName::Noop)
    }

    pub fn stage(table: &str, source: &str) -> Self {
        Self::new(TaskKindName::Stage).table(table).source(source)
    }

    pub fn fact(table: &str, sql: &str) -> Self {
        Self::new(TaskKindName::Fact).table(table).sql(sql)
    }

    pub fn dimension(table: &str, sql: &str, truncate: bool) -> Self {
        Self::new(TaskKindName::Dimension)
            .table(table)
            .sql(sql)
            .truncate(truncate)
    }

    pub fn quality(tables: &[&str]) -> Self {
        let mut builder = Self::new(TaskKindName::Quality);
        builder.task.tables = tables.iter().map(|t| t.to_string()).collect();
        builder
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn table(mut self, table: &str) -> Self {
        self.task.table = Some(table.to_string());
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.task.source = Some(source.to_string());
        self
    }

    pub fn format(mut self, format: &str) -> Self {
        self.task.format = format.to_string();
        self
    }

    pub fn sql(mut self, sql: &str) -> Self {
        self.task.sql = Some(sql.to_string());
        self
    }

    pub fn truncate(mut self, val: bool) -> Self {
        self.task.truncate = val;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
