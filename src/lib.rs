// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod quality;
pub mod sink;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{PipelineGraph, TaskState};
use crate::exec::{RunResult, Scheduler};
use crate::sink::SinkAdapter;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - graph + scheduler construction
/// - one pipeline run against the given sink
/// - Ctrl-C handling (cancels the run; in-flight tasks finish)
///
/// The sink adapter is caller-provided: the bundled binary passes the
/// in-memory stub, a deployment passes its warehouse-backed adapter.
pub async fn run(args: CliArgs, sink: Arc<dyn SinkAdapter>) -> Result<RunResult> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let graph = PipelineGraph::from_config(&cfg)?;

    if args.dry_run {
        print_dry_run(&cfg, &graph);
        return Ok(empty_run_result());
    }

    let policy = cfg.pipeline.retry_policy();
    let scheduler = Scheduler::new(graph, policy);

    // Ctrl-C → cancel: stop dispatching new batches, let in-flight finish.
    {
        let cancel = scheduler.cancel_handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl-C received; cancelling run");
            cancel.cancel();
        });
    }

    info!(
        owner = %cfg.pipeline.owner,
        schedule = cfg.pipeline.schedule.as_deref().unwrap_or("-"),
        "running pipeline"
    );

    let result = scheduler.run(sink).await?;
    print_run_report(&result);
    Ok(result)
}

/// Placeholder result for dry runs (nothing executed).
fn empty_run_result() -> RunResult {
    RunResult {
        run_id: 0,
        duration: std::time::Duration::ZERO,
        reports: Default::default(),
        failures: Vec::new(),
    }
}

/// Simple dry-run output: print tasks, kinds and dependencies.
fn print_dry_run(cfg: &ConfigFile, graph: &PipelineGraph) {
    println!("loaddag dry-run");
    println!("  pipeline.owner = {}", cfg.pipeline.owner);
    println!("  pipeline.max_retries = {}", cfg.pipeline.max_retries);
    println!(
        "  pipeline.retry_delay_secs = {}",
        cfg.pipeline.retry_delay_secs
    );
    if let Some(ref schedule) = cfg.pipeline.schedule {
        println!("  pipeline.schedule = {schedule}");
    }
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        if let Ok(kind) = task.to_kind() {
            println!("      kind: {}", kind.label());
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if let Some(ref table) = task.table {
            println!("      table: {table}");
        }
        if let Some(ref source) = task.source {
            println!("      source: {source}");
        }
        if task.truncate {
            println!("      truncate: true");
        }
        if !task.tables.is_empty() {
            println!("      tables: {:?}", task.tables);
        }
    }
    println!();

    println!("batches:");
    for (i, batch) in graph.topological_batches().iter().enumerate() {
        println!("  {i}: {batch:?}");
    }
}

/// Per-task outcome table printed after a run.
fn print_run_report(result: &RunResult) {
    println!("run {} report:", result.run_id);
    for (name, report) in result.reports.iter() {
        match (&report.state, &report.error) {
            (TaskState::Failed, Some(err)) => {
                println!("  {name}: {:?} after {} attempt(s): {err}", report.state, report.attempts);
            }
            _ => {
                println!("  {name}: {:?}", report.state);
            }
        }
    }
    if result.succeeded() {
        println!("pipeline succeeded");
    } else {
        println!("pipeline FAILED ({} failure(s))", result.failures.len());
    }
}
