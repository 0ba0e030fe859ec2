// tests/concurrent_run.rs

//! Only one run may be active at a time: a second invocation while the
//! first is in flight is rejected, not queued.

use std::error::Error;
use std::sync::Arc;

use tokio::sync::Semaphore;

use loaddag::dag::{GraphBuilder, TaskKind, TaskNode};
use loaddag::errors::PipelineError;
use loaddag::exec::{RetryPolicy, Scheduler};
use loaddag::sink::{Row, SinkAdapter, SinkFuture};
use loaddag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// A sink whose `bulk_load` blocks until the test releases a permit, so a
/// run can be held open deliberately.
struct GatedSink {
    gate: Arc<Semaphore>,
}

impl SinkAdapter for GatedSink {
    fn execute<'a>(&'a self, _sql: &'a str) -> SinkFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    fn query<'a>(&'a self, _sql: &'a str) -> SinkFuture<'a, Vec<Row>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn bulk_load<'a>(
        &'a self,
        _source: &'a str,
        _table: &'a str,
        _format: &'a str,
    ) -> SinkFuture<'a, ()> {
        let gate = Arc::clone(&self.gate);
        Box::pin(async move {
            let _permit = gate.acquire().await.expect("gate closed");
            Ok(())
        })
    }

    fn truncate<'a>(&'a self, _table: &'a str) -> SinkFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }
}

fn single_stage_graph() -> loaddag::dag::PipelineGraph {
    GraphBuilder::new()
        .add_task(TaskNode::new(
            "stage_events",
            TaskKind::StageLoad {
                table: "staging_events".to_string(),
                source: "s3://bucket/log_data".to_string(),
                format: "json".to_string(),
            },
        ))
        .build()
        .unwrap()
}

#[tokio::test]
async fn second_invocation_while_active_is_rejected() -> TestResult {
    with_timeout(async {
        init_tracing();

        let scheduler = Arc::new(Scheduler::new(
            single_stage_graph(),
            RetryPolicy::immediate(0),
        ));

        let gate = Arc::new(Semaphore::new(0));
        let sink: Arc<dyn SinkAdapter> = Arc::new(GatedSink {
            gate: Arc::clone(&gate),
        });

        // First run blocks inside bulk_load until the gate opens.
        let first = {
            let scheduler = Arc::clone(&scheduler);
            let sink = Arc::clone(&sink);
            tokio::spawn(async move { scheduler.run(sink).await })
        };

        while !scheduler.is_active() {
            tokio::task::yield_now().await;
        }

        // Second invocation must be rejected immediately, not queued.
        let err = scheduler.run(Arc::clone(&sink)).await.unwrap_err();
        assert!(matches!(err, PipelineError::ConcurrentRun), "got {err:?}");

        // Release the first run and let it finish cleanly.
        gate.add_permits(1);
        let result = first.await??;
        assert!(result.succeeded());

        // With the run finished, the guard is released and a new run is
        // accepted again.
        assert!(!scheduler.is_active());
        let result = scheduler.run(sink).await?;
        assert!(result.succeeded());
        assert_eq!(result.run_id, 2);

        Ok(())
    })
    .await
}
