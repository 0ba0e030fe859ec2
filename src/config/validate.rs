// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.pipeline, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_task_kinds(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    validate_markers(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(PipelineError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_kinds(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        task.to_kind().map_err(|e| match e {
            PipelineError::ConfigError(msg) => {
                PipelineError::ConfigError(format!("task '{}': {}", name, msg))
            }
            other => other,
        })?;
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(PipelineError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(PipelineError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Build a simple petgraph graph from the tasks and their dependencies.
    //
    // Edge direction: dep -> task
    // For:
    //   [task.B]
    //   after = ["A"]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(PipelineError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                node
            )))
        }
    }
}

/// The pipeline must have exactly one begin marker (a task nothing depends
/// on) and one end marker (a task with no dependents), so a run has a single
/// well-defined entry and exit.
fn validate_markers(cfg: &RawConfigFile) -> Result<()> {
    let roots: Vec<&str> = cfg
        .task
        .iter()
        .filter(|(_, task)| task.after.is_empty())
        .map(|(name, _)| name.as_str())
        .collect();

    if roots.len() != 1 {
        return Err(PipelineError::ConfigError(format!(
            "pipeline must have exactly one task with no dependencies (found {}: {:?})",
            roots.len(),
            roots
        )));
    }

    let depended_on: std::collections::BTreeSet<&str> = cfg
        .task
        .values()
        .flat_map(|task| task.after.iter().map(|s| s.as_str()))
        .collect();

    let terminals: Vec<&str> = cfg
        .task
        .keys()
        .map(|name| name.as_str())
        .filter(|name| !depended_on.contains(name))
        .collect();

    if terminals.len() != 1 {
        return Err(PipelineError::ConfigError(format!(
            "pipeline must have exactly one task with no dependents (found {}: {:?})",
            terminals.len(),
            terminals
        )));
    }

    Ok(())
}
