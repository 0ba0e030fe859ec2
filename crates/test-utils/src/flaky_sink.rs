use std::sync::Mutex;

use loaddag::sink::{MemorySink, Row, SinkAdapter, SinkError, SinkFuture};

/// A planned failure: the next `remaining` operations whose description
/// contains `needle` fail with `error`.
struct Planned {
    needle: String,
    remaining: u32,
    error: SinkError,
}

/// A sink adapter that:
/// - delegates to an inner [`MemorySink`]
/// - fails scripted operations, so tests can exercise the retry policy and
///   skip propagation without a real warehouse.
///
/// Operations are matched by substring against a textual description:
/// the SQL for `execute`/`query`, `"bulk_load <source> <table>"`, and
/// `"truncate <table>"`.
pub struct FlakySink {
    inner: MemorySink,
    plan: Mutex<Vec<Planned>>,
}

impl FlakySink {
    pub fn new(inner: MemorySink) -> Self {
        Self {
            inner,
            plan: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `times` operations matching `needle` with `error`.
    pub fn fail_matching(&self, needle: &str, times: u32, error: SinkError) {
        let mut plan = self.plan.lock().unwrap();
        plan.push(Planned {
            needle: needle.to_string(),
            remaining: times,
            error,
        });
    }

    /// Access the delegate sink (for fixtures and row-count assertions).
    pub fn inner(&self) -> &MemorySink {
        &self.inner
    }

    fn check(&self, description: &str) -> Result<(), SinkError> {
        let mut plan = self.plan.lock().unwrap();
        for planned in plan.iter_mut() {
            if planned.remaining > 0 && description.contains(&planned.needle) {
                planned.remaining -= 1;
                return Err(planned.error.clone());
            }
        }
        Ok(())
    }
}

impl SinkAdapter for FlakySink {
    fn execute<'a>(&'a self, sql: &'a str) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            self.check(sql)?;
            self.inner.execute(sql).await
        })
    }

    fn query<'a>(&'a self, sql: &'a str) -> SinkFuture<'a, Vec<Row>> {
        Box::pin(async move {
            self.check(sql)?;
            self.inner.query(sql).await
        })
    }

    fn bulk_load<'a>(
        &'a self,
        source: &'a str,
        table: &'a str,
        format: &'a str,
    ) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            self.check(&format!("bulk_load {source} {table}"))?;
            self.inner.bulk_load(source, table, format).await
        })
    }

    fn truncate<'a>(&'a self, table: &'a str) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            self.check(&format!("truncate {table}"))?;
            self.inner.truncate(table).await
        })
    }
}
