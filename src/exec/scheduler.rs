// src/exec/scheduler.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::dag::{PipelineGraph, TaskName, TaskState};
use crate::errors::{PipelineError, Result, TaskError};
use crate::exec::retry::{run_with_retry, RetryPolicy};
use crate::exec::{CancelHandle, RunResult, TaskReport};
use crate::sink::SinkAdapter;

/// Walks the graph batch by batch, dispatching ready tasks and applying
/// the retry policy.
///
/// It is responsible for:
/// - enforcing the single-active-run constraint
/// - dispatching each topological batch with intra-batch parallelism
/// - marking dependents of a failed task as skipped
/// - aggregating every independent failure into the run result
#[derive(Debug)]
pub struct Scheduler {
    graph: PipelineGraph,
    policy: RetryPolicy,
    /// Monotonically increasing run ID.
    run_counter: AtomicU64,
    /// Guards the single-active-run constraint.
    active: AtomicBool,
    cancel: CancelHandle,
}

/// Releases the active-run flag when the run ends, on every exit path.
struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Scheduler {
    pub fn new(graph: PipelineGraph, policy: RetryPolicy) -> Self {
        Self {
            graph,
            policy,
            run_counter: AtomicU64::new(0),
            active: AtomicBool::new(false),
            cancel: CancelHandle::new(),
        }
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    /// Returns `true` while a run is in flight.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Handle for cancelling the current (or next) run from outside.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Execute one run of the pipeline.
    ///
    /// Rejects the invocation with [`PipelineError::ConcurrentRun`] if a
    /// prior run is still active; the triggering caller is expected to back
    /// off and retry later, not queue.
    pub async fn run(&self, sink: Arc<dyn SinkAdapter>) -> Result<RunResult> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("run rejected; a prior run is still active");
            return Err(PipelineError::ConcurrentRun);
        }
        let _guard = ActiveGuard(&self.active);
        self.cancel.reset();

        let run_id = self.run_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let started_at = std::time::Instant::now();
        info!(run_id, tasks = self.graph.len(), "starting pipeline run");

        let mut states: BTreeMap<TaskName, TaskState> = self
            .graph
            .tasks()
            .map(|name| (name.to_string(), TaskState::Pending))
            .collect();
        let mut attempts: BTreeMap<TaskName, u32> = BTreeMap::new();
        let mut errors: BTreeMap<TaskName, TaskError> = BTreeMap::new();
        let mut failures: Vec<(TaskName, TaskError)> = Vec::new();

        for batch in self.graph.topological_batches() {
            if self.cancel.is_cancelled() {
                info!(run_id, "run cancelled; not dispatching further batches");
                break;
            }

            let mut join_set = JoinSet::new();

            for name in &batch {
                if states[name] == TaskState::Skipped {
                    continue;
                }

                // A task runs only once every dependency has succeeded.
                // Eager skip propagation normally settles this before the
                // batch is reached, so this check is a backstop.
                let deps_ok = self
                    .graph
                    .dependencies_of(name)
                    .iter()
                    .all(|dep| states[dep] == TaskState::Succeeded);
                if !deps_ok {
                    debug!(task = %name, run_id, "dependencies unsatisfied; skipping");
                    states.insert(name.clone(), TaskState::Skipped);
                    continue;
                }

                states.insert(name.clone(), TaskState::Ready);
                let node = self
                    .graph
                    .node(name)
                    .expect("batch names come from the graph")
                    .clone();
                let sink = Arc::clone(&sink);
                let policy = self.policy;

                debug!(task = %name, run_id, kind = node.kind.label(), "dispatching task");
                states.insert(name.clone(), TaskState::Running);

                join_set.spawn(async move {
                    let outcome = run_with_retry(&node, sink.as_ref(), &policy).await;
                    (node.name, outcome)
                });
            }

            // Batch barrier: the next batch never starts before every task
            // here reaches a terminal state. Siblings of a failed task are
            // allowed to finish; their results are recorded but unlock
            // nothing downstream of the failure.
            while let Some(joined) = join_set.join_next().await {
                let (name, outcome) = joined.map_err(|e| {
                    PipelineError::Other(anyhow::anyhow!("task execution panicked: {e}"))
                })?;

                attempts.insert(name.clone(), outcome.attempts);
                match outcome.result {
                    Ok(()) => {
                        info!(task = %name, run_id, "task succeeded");
                        states.insert(name.clone(), TaskState::Succeeded);
                    }
                    Err(err) => {
                        warn!(
                            task = %name,
                            run_id,
                            attempts = outcome.attempts,
                            error = %err,
                            "task failed; skipping dependents"
                        );
                        states.insert(name.clone(), TaskState::Failed);
                        errors.insert(name.clone(), err.clone());
                        failures.push((name.clone(), err));
                        mark_dependents_skipped(&self.graph, &name, &mut states);
                    }
                }
            }
        }

        // Tasks never reached (cancellation) end the run as skipped.
        for state in states.values_mut() {
            if !state.is_terminal() {
                *state = TaskState::Skipped;
            }
        }

        let reports: BTreeMap<TaskName, TaskReport> = states
            .into_iter()
            .map(|(name, state)| {
                let report = match state {
                    TaskState::Skipped => TaskReport::skipped(),
                    _ => TaskReport {
                        state,
                        attempts: attempts.get(&name).copied().unwrap_or(0),
                        error: errors.get(&name).cloned(),
                    },
                };
                (name, report)
            })
            .collect();

        let result = RunResult {
            run_id,
            duration: started_at.elapsed(),
            reports,
            failures,
        };

        if result.succeeded() {
            info!(run_id, elapsed_ms = result.duration.as_millis() as u64, "pipeline run succeeded");
        } else {
            warn!(
                run_id,
                elapsed_ms = result.duration.as_millis() as u64,
                failures = result.failures.len(),
                "pipeline run failed"
            );
        }

        Ok(result)
    }
}

/// Mark all not-yet-started dependents (and their transitive dependents) of
/// a failed task as skipped.
fn mark_dependents_skipped(
    graph: &PipelineGraph,
    failed_task: &str,
    states: &mut BTreeMap<TaskName, TaskState>,
) {
    let mut stack: Vec<TaskName> = graph.dependents_of(failed_task).to_vec();

    while let Some(name) = stack.pop() {
        match states.get(&name) {
            Some(TaskState::Pending) | Some(TaskState::Ready) => {
                debug!(
                    task = %name,
                    "marking dependent as skipped due to upstream failure"
                );
                states.insert(name.clone(), TaskState::Skipped);
                stack.extend(graph.dependents_of(&name).iter().cloned());
            }
            // Running siblings finish on their own; terminal states stay.
            _ => {}
        }
    }
}
