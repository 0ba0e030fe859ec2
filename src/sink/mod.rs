// src/sink/mod.rs

//! Pluggable sink adapter abstraction.
//!
//! Tasks and the data quality engine talk to a `SinkAdapter` instead of a
//! concrete warehouse client. This keeps warehouse connectivity and
//! credentials out of the engine and makes it easy to swap in an in-memory
//! sink in tests while a deployment provides the real adapter.
//!
//! - [`MemorySink`] is the stub implementation shipped with the crate.
//! - The adapter is shared by every task in a batch, so implementations must
//!   be safe for concurrent use (`Send + Sync`).

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub mod memory;

pub use memory::MemorySink;

/// A single scalar value in a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

/// One row of a query result: an ordered sequence of scalar values.
pub type Row = Vec<Scalar>;

/// How a sink failure should be treated by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkErrorKind {
    /// Worth retrying: connectivity timeouts, throttling.
    Transient,
    /// Not worth retrying: malformed SQL, missing table, authorization.
    Permanent,
}

impl std::fmt::Display for SinkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkErrorKind::Transient => write!(f, "transient"),
            SinkErrorKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// Error reported by a sink adapter operation.
#[derive(Error, Debug, Clone)]
#[error("{kind} sink error: {message}")]
pub struct SinkError {
    pub kind: SinkErrorKind,
    pub message: String,
}

impl SinkError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: SinkErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: SinkErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == SinkErrorKind::Transient
    }
}

/// Future type returned by sink adapter methods.
///
/// Boxed so the trait stays object-safe; adapters are used as
/// `Arc<dyn SinkAdapter>` throughout the scheduler.
pub type SinkFuture<'a, T> =
    Pin<Box<dyn Future<Output = std::result::Result<T, SinkError>> + Send + 'a>>;

/// Trait abstracting the external data store tasks write to and the data
/// quality engine reads from.
///
/// Production code wires a warehouse-backed implementation; tests (and the
/// bundled CLI) use [`MemorySink`].
pub trait SinkAdapter: Send + Sync {
    /// Execute a write statement (insert, DDL).
    fn execute<'a>(&'a self, sql: &'a str) -> SinkFuture<'a, ()>;

    /// Run a read-only query and return the full result set.
    fn query<'a>(&'a self, sql: &'a str) -> SinkFuture<'a, Vec<Row>>;

    /// Bulk-load from an object storage location into `table`, replacing its
    /// contents.
    fn bulk_load<'a>(
        &'a self,
        source: &'a str,
        table: &'a str,
        format: &'a str,
    ) -> SinkFuture<'a, ()>;

    /// Clear `table` in a single all-or-nothing operation.
    fn truncate<'a>(&'a self, table: &'a str) -> SinkFuture<'a, ()>;
}
