// tests/cancellation.rs

//! Cancelling a run lets in-flight tasks finish but dispatches no further
//! batches; the remainder of the graph ends the run as skipped.

use std::error::Error;
use std::sync::Arc;

use tokio::sync::Semaphore;

use loaddag::dag::{GraphBuilder, TaskKind, TaskNode, TaskState};
use loaddag::exec::{RetryPolicy, Scheduler};
use loaddag::sink::{Row, SinkAdapter, SinkFuture};
use loaddag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

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

fn stage(name: &str, table: &str) -> TaskNode {
    TaskNode::new(
        name,
        TaskKind::StageLoad {
            table: table.to_string(),
            source: format!("s3://bucket/{table}"),
            format: "json".to_string(),
        },
    )
}

#[tokio::test]
async fn cancel_lets_inflight_finish_and_skips_the_rest() -> TestResult {
    with_timeout(async {
        init_tracing();

        let scheduler = Arc::new(Scheduler::new(
            GraphBuilder::new()
                .add_task(stage("stage_events", "staging_events"))
                .add_task(stage("load_more", "more"))
                .then("stage_events", "load_more")
                .build()?,
            RetryPolicy::immediate(0),
        ));

        let gate = Arc::new(Semaphore::new(0));
        let sink: Arc<dyn SinkAdapter> = Arc::new(GatedSink {
            gate: Arc::clone(&gate),
        });

        let cancel = scheduler.cancel_handle();

        let run = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(sink).await })
        };

        while !scheduler.is_active() {
            tokio::task::yield_now().await;
        }

        // Cancel while the first task is blocked inside the sink, then let
        // it complete.
        cancel.cancel();
        gate.add_permits(1);

        let result = run.await??;

        assert!(!result.succeeded());
        assert_eq!(result.state_of("stage_events"), Some(TaskState::Succeeded));
        assert_eq!(result.state_of("load_more"), Some(TaskState::Skipped));
        assert!(result.failures.is_empty());

        Ok(())
    })
    .await
}
