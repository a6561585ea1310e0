//! Testing utilities for bulk writes
//!
//! [`MockExecutor`] records every statement in memory and can be told to fail
//! or stall, so writer behavior can be checked without a database.
//!
//! ```
//! use rdbc_bulk::prelude::*;
//! use rdbc_bulk::testing::MockExecutor;
//!
//! # tokio_test_block(async {
//! let writer = BulkWriter::new(MockExecutor::new(), BulkConfig::default()).unwrap();
//! writer.empty_table("users").await.unwrap();
//! assert_eq!(writer.executor().statements()[0].sql, "DELETE FROM users");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::connection::Executor;
use crate::error::{Error, Result};
use crate::types::{BindSet, Row};

type FailurePredicate = Box<dyn Fn(&str, &BindSet) -> bool + Send + Sync>;

/// A statement seen by [`MockExecutor`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    /// SQL text with named placeholders
    pub sql: String,
    /// Binds for a single statement, or the first row of an `exec_many` call
    pub binds: BindSet,
    /// Rows submitted (1 for `exec`)
    pub rows: usize,
    /// Whether the call was made to fail
    pub failed: bool,
}

/// In-memory [`Executor`] for tests
pub struct MockExecutor {
    statements: Mutex<Vec<RecordedStatement>>,
    fail_when: Option<FailurePredicate>,
    delay: Option<Duration>,
    rows_affected: u64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closed: AtomicBool,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockExecutor")
            .field("statements", &self.statements.lock().len())
            .field("delay", &self.delay)
            .field("rows_affected", &self.rows_affected)
            .finish_non_exhaustive()
    }
}

impl MockExecutor {
    /// Create a mock that succeeds with one affected row per bind set
    pub fn new() -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            fail_when: None,
            delay: None,
            rows_affected: 1,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Fail every call for which `predicate(sql, binds)` returns true
    pub fn fail_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &BindSet) -> bool + Send + Sync + 'static,
    {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    /// Sleep for `delay` inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Affected rows reported per bind set
    pub fn with_rows_affected(mut self, rows: u64) -> Self {
        self.rows_affected = rows;
        self
    }

    /// Recorded statements in completion order
    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.statements.lock().clone()
    }

    /// Number of recorded statements
    pub fn statement_count(&self) -> usize {
        self.statements.lock().len()
    }

    /// Number of recorded statements that failed
    pub fn failure_count(&self) -> usize {
        self.statements.lock().iter().filter(|s| s.failed).count()
    }

    /// Highest number of calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Whether [`Executor::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn call(&self, sql: &str, binds: &[&BindSet]) -> Result<u64> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failed = self
            .fail_when
            .as_ref()
            .is_some_and(|predicate| binds.iter().any(|b| predicate(sql, b)));

        self.statements.lock().push(RecordedStatement {
            sql: sql.to_string(),
            binds: binds.first().map(|b| (*b).clone()).unwrap_or_default(),
            rows: binds.len(),
            failed,
        });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if failed {
            return Err(Error::query_with_sql("mock failure", sql));
        }
        Ok(self.rows_affected * binds.len() as u64)
    }
}

#[async_trait]
impl Executor for MockExecutor {
    async fn exec(&self, sql: &str, binds: &BindSet) -> Result<u64> {
        self.call(sql, &[binds]).await
    }

    async fn exec_many(&self, sql: &str, rows: &[Row]) -> Result<u64> {
        let binds: Vec<&BindSet> = rows.iter().collect();
        self.call(sql, &binds).await
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[tokio::test]
    async fn test_records_statements() {
        let mock = MockExecutor::new().with_rows_affected(2);
        let binds = BindSet::from([("id".to_string(), Value::from(1))]);

        assert_eq!(mock.exec("DELETE FROM t WHERE id = :id", &binds).await.unwrap(), 2);
        assert_eq!(mock.statement_count(), 1);
        assert_eq!(mock.statements()[0].binds, binds);
        assert_eq!(mock.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_exec_many_counts_rows() {
        let mock = MockExecutor::new();
        let rows = vec![Row::new(), Row::new(), Row::new()];

        assert_eq!(mock.exec_many("INSERT", &rows).await.unwrap(), 3);
        assert_eq!(mock.statements()[0].rows, 3);
    }

    #[tokio::test]
    async fn test_failure_predicate() {
        let mock = MockExecutor::new()
            .fail_when(|_, binds| binds.get("id") == Some(&Value::from(2)));

        let ok = BindSet::from([("id".to_string(), Value::from(1))]);
        let bad = BindSet::from([("id".to_string(), Value::from(2))]);

        assert!(mock.exec("x", &ok).await.is_ok());
        let err = mock.exec("x", &bad).await.unwrap_err();
        assert!(matches!(err, Error::Query { .. }));
        assert_eq!(mock.failure_count(), 1);
        assert_eq!(mock.statement_count(), 2);
    }
}
