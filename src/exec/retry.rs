// src/exec/retry.rs

//! Per-task retry policy.

use std::time::Duration;

use tracing::warn;

use crate::dag::TaskNode;
use crate::errors::TaskError;
use crate::exec::task_runner::run_task;
use crate::sink::SinkAdapter;

/// Fixed retry policy applied to every task in a run.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt. A task failing transiently every
    /// time executes `max_retries + 1` times in total.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Policy with no delay between attempts; used in tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_delay: Duration::ZERO,
        }
    }
}

/// Result of driving one task through the retry loop.
#[derive(Debug)]
pub struct AttemptOutcome {
    /// Number of executions, including the initial attempt.
    pub attempts: u32,
    pub result: Result<(), TaskError>,
}

/// Execute `node` against the sink, retrying transient failures.
///
/// Permanent sink errors and quality violations short-circuit without
/// consuming retry budget.
pub async fn run_with_retry(
    node: &TaskNode,
    sink: &dyn SinkAdapter,
    policy: &RetryPolicy,
) -> AttemptOutcome {
    let mut attempts = 0;

    loop {
        attempts += 1;

        match run_task(node, sink).await {
            Ok(()) => {
                return AttemptOutcome {
                    attempts,
                    result: Ok(()),
                };
            }
            Err(err) if err.is_transient() && attempts <= policy.max_retries => {
                warn!(
                    task = %node.name,
                    attempt = attempts,
                    max_retries = policy.max_retries,
                    error = %err,
                    "transient task failure; retrying after delay"
                );
                tokio::time::sleep(policy.retry_delay).await;
            }
            Err(err) => {
                return AttemptOutcome {
                    attempts,
                    result: Err(err),
                };
            }
        }
    }
}
