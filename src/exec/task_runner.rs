// src/exec/task_runner.rs

//! Individual task execution against the sink adapter.

use tracing::{debug, info};

use crate::dag::{TaskKind, TaskNode};
use crate::errors::TaskError;
use crate::quality::DataQualityEngine;
use crate::sink::SinkAdapter;

/// Run a single task once.
///
/// The only suspension points are the sink adapter calls; a `NoOp` task
/// completes without touching the sink at all.
pub async fn run_task(node: &TaskNode, sink: &dyn SinkAdapter) -> Result<(), TaskError> {
    match &node.kind {
        TaskKind::NoOp => {
            debug!(task = %node.name, "marker task; nothing to do");
            Ok(())
        }

        TaskKind::StageLoad {
            table,
            source,
            format,
        } => {
            info!(
                task = %node.name,
                table = %table,
                source = %source,
                "staging data from source into sink"
            );
            sink.bulk_load(source, table, format).await?;
            Ok(())
        }

        TaskKind::FactLoad { table, sql } => {
            info!(task = %node.name, table = %table, "loading fact table");
            sink.execute(sql).await?;
            Ok(())
        }

        TaskKind::DimensionLoad {
            table,
            sql,
            truncate,
        } => {
            if *truncate {
                info!(
                    task = %node.name,
                    table = %table,
                    "truncating dimension table before load"
                );
                sink.truncate(table).await?;
            }
            info!(
                task = %node.name,
                table = %table,
                truncate = *truncate,
                "loading dimension table"
            );
            sink.execute(sql).await?;
            Ok(())
        }

        TaskKind::QualityCheck { checks } => {
            info!(
                task = %node.name,
                checks = checks.len(),
                "running data quality checks"
            );
            DataQualityEngine::new(sink).evaluate(checks).await
        }
    }
}
