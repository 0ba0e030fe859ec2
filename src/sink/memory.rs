// src/sink/memory.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{Row, Scalar, SinkAdapter, SinkError, SinkFuture};

#[derive(Debug, Default)]
struct MemorySinkState {
    /// Table name -> rows currently in the table.
    tables: BTreeMap<String, Vec<Row>>,
    /// Source location -> rows a bulk load from that location produces.
    fixtures: BTreeMap<String, Vec<Row>>,
    /// Every statement passed to `execute`, in order.
    statements: Vec<String>,
}

/// In-memory sink adapter.
///
/// Stands in for a warehouse connection in tests and local runs:
///
/// - `bulk_load` replaces the destination table with the fixture rows
///   registered for the source location (full replace, like a COPY into a
///   staging table).
/// - `execute` records the statement; when it looks like
///   `INSERT INTO <table> SELECT ... FROM <source>`, the source table's rows
///   are appended to the destination, so row counts behave the way a
///   warehouse insert-select would (an empty source inserts nothing). An
///   insert without a FROM clause appends one synthetic row.
/// - `query` answers `SELECT count(*) FROM <table>`; unknown tables read as
///   empty. Other queries return the stored rows verbatim.
///
/// Cloning shares the underlying state, so a test can keep a handle while
/// the scheduler owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemorySinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the rows a `bulk_load` from `source` should produce.
    pub fn add_fixture(&self, source: impl Into<String>, rows: Vec<Row>) {
        let mut state = self.state.lock().unwrap();
        state.fixtures.insert(source.into(), rows);
    }

    /// Pre-populate a table directly.
    pub fn seed_table(&self, table: impl Into<String>, rows: Vec<Row>) {
        let mut state = self.state.lock().unwrap();
        state.tables.insert(table.into(), rows);
    }

    /// Current number of rows in `table` (0 if the table was never written).
    pub fn row_count(&self, table: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.tables.get(table).map(|rows| rows.len()).unwrap_or(0)
    }

    /// Every statement seen by `execute`, in order.
    pub fn executed_statements(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.statements.clone()
    }
}

/// Extract the destination table from an `INSERT INTO <table> ...` statement.
fn insert_target(sql: &str) -> Option<String> {
    let mut words = sql.split_whitespace();
    let first = words.next()?;
    let second = words.next()?;
    if first.eq_ignore_ascii_case("insert") && second.eq_ignore_ascii_case("into") {
        words.next().map(|t| t.trim_end_matches('(').to_string())
    } else {
        None
    }
}

/// Extract the table from a `SELECT count(*) FROM <table>` query.
fn count_target(sql: &str) -> Option<String> {
    let lowered = sql.to_ascii_lowercase();
    if !lowered.trim_start().starts_with("select count(*)") {
        return None;
    }
    let mut after_from = false;
    for word in sql.split_whitespace() {
        if after_from {
            return Some(word.to_string());
        }
        if word.eq_ignore_ascii_case("from") {
            after_from = true;
        }
    }
    None
}

impl SinkAdapter for MemorySink {
    fn execute<'a>(&'a self, sql: &'a str) -> SinkFuture<'a, ()> {
        let state = Arc::clone(&self.state);
        let sql = sql.to_string();
        Box::pin(async move {
            let mut state = state.lock().unwrap();
            if let Some(table) = insert_target(&sql) {
                let incoming = match table_target(&sql) {
                    Some(source) => state.tables.get(&source).cloned().unwrap_or_default(),
                    None => {
                        let next = state.tables.get(&table).map(|r| r.len()).unwrap_or(0);
                        vec![vec![Scalar::Int(next as i64 + 1)]]
                    }
                };
                state.tables.entry(table).or_default().extend(incoming);
            }
            state.statements.push(sql);
            Ok(())
        })
    }

    fn query<'a>(&'a self, sql: &'a str) -> SinkFuture<'a, Vec<Row>> {
        let state = Arc::clone(&self.state);
        let sql = sql.to_string();
        Box::pin(async move {
            let state = state.lock().unwrap();
            if let Some(table) = count_target(&sql) {
                let count = state.tables.get(&table).map(|rows| rows.len()).unwrap_or(0);
                return Ok(vec![vec![Scalar::Int(count as i64)]]);
            }
            if let Some(table) = table_target(&sql) {
                return Ok(state.tables.get(&table).cloned().unwrap_or_default());
            }
            Err(SinkError::permanent(format!("unsupported query: {sql}")))
        })
    }

    fn bulk_load<'a>(
        &'a self,
        source: &'a str,
        table: &'a str,
        _format: &'a str,
    ) -> SinkFuture<'a, ()> {
        let state = Arc::clone(&self.state);
        let source = source.to_string();
        let table = table.to_string();
        Box::pin(async move {
            let mut state = state.lock().unwrap();
            let rows = state.fixtures.get(&source).cloned().unwrap_or_default();
            state.tables.insert(table, rows);
            Ok(())
        })
    }

    fn truncate<'a>(&'a self, table: &'a str) -> SinkFuture<'a, ()> {
        let state = Arc::clone(&self.state);
        let table = table.to_string();
        Box::pin(async move {
            let mut state = state.lock().unwrap();
            state.tables.insert(table, Vec::new());
            Ok(())
        })
    }
}

/// Extract the source table: the word following the last `FROM` keyword.
///
/// Last rather than first so `extract(hour from ts)` expressions earlier in
/// a statement don't shadow the actual source clause.
fn table_target(sql: &str) -> Option<String> {
    let words: Vec<&str> = sql.split_whitespace().collect();
    let from_idx = words
        .iter()
        .rposition(|word| word.eq_ignore_ascii_case("from"))?;
    words.get(from_idx + 1).map(|t| t.to_string())
}
