// src/quality.rs

//! Data quality gating.
//!
//! The terminal quality-check task hands its assertions to
//! [`DataQualityEngine::evaluate`], which runs each verification query
//! against the sink and applies the assertion's predicate to the raw result
//! set. Evaluation is fail-fast: the first violation fails the task and
//! names the offending target.
//!
//! The built-in bar is deliberately low and deterministic: a load that left
//! its table empty must never be declared successful.

use thiserror::Error;
use tracing::info;

use crate::errors::TaskError;
use crate::sink::{Row, Scalar, SinkAdapter};

/// A failed data quality assertion.
#[derive(Error, Debug, Clone)]
#[error("Table {target} {reason}")]
pub struct QualityViolation {
    pub target: String,
    pub reason: String,
}

impl QualityViolation {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Predicate applied to a verification query's result set.
///
/// Receives the raw rows and the target name (for error messages); returns
/// the observed record count on pass.
pub type Predicate = fn(&[Row], &str) -> std::result::Result<u64, QualityViolation>;

/// A single named assertion against a sink object.
#[derive(Debug, Clone)]
pub struct QualityAssertion {
    /// Name of the sink object under test.
    pub target: String,
    /// Read-only verification query.
    pub sql: String,
    pub predicate: Predicate,
}

impl QualityAssertion {
    /// Assert that `table` contains at least one record.
    pub fn row_count(table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            sql: format!("SELECT count(*) FROM {table}"),
            target: table,
            predicate: non_empty_and_nonzero,
        }
    }
}

/// Built-in predicate: the result set must be non-empty, its first row
/// non-empty, and the first value at least 1.
pub fn non_empty_and_nonzero(
    records: &[Row],
    target: &str,
) -> std::result::Result<u64, QualityViolation> {
    let first = records
        .first()
        .and_then(|row| row.first())
        .ok_or_else(|| QualityViolation::new(target, "returns no results"))?;

    let count = match first {
        Scalar::Int(n) => *n,
        other => {
            return Err(QualityViolation::new(
                target,
                format!("returned a non-numeric count: {other:?}"),
            ));
        }
    };

    if count < 1 {
        return Err(QualityViolation::new(target, "contains 0 records"));
    }

    Ok(count as u64)
}

/// Runs quality assertions against the sink, stopping at the first failure.
pub struct DataQualityEngine<'a> {
    sink: &'a dyn SinkAdapter,
}

impl<'a> DataQualityEngine<'a> {
    pub fn new(sink: &'a dyn SinkAdapter) -> Self {
        Self { sink }
    }

    /// Evaluate each assertion in order.
    ///
    /// A sink error while running a verification query surfaces as a
    /// [`TaskError::Sink`] (and is retryable if transient); a predicate
    /// failure surfaces as [`TaskError::Quality`] and is always terminal.
    pub async fn evaluate(&self, assertions: &[QualityAssertion]) -> Result<(), TaskError> {
        for assertion in assertions {
            let records = self.sink.query(&assertion.sql).await?;
            let count = (assertion.predicate)(&records, &assertion.target)
                .map_err(TaskError::Quality)?;

            info!(
                target = %assertion.target,
                records = count,
                "data quality check passed"
            );
        }
        Ok(())
    }
}
