//! Bulk writer
//!
//! [`BulkWriter`] splits a row set into units (pages or single rows), compiles
//! a statement per unit and drives an [`Executor`] under one of the
//! [`Strategy`] variants.
//!
//! Concurrent strategies run on a bounded pool: a `Semaphore` with
//! `worker_count` permits, one spawned task per unit, and a final
//! `acquire_many` that waits for every unit before results are read. Errors are
//! queued on a bounded channel; the first one drained is returned and the rest
//! are counted and dropped. A failure never cancels other units.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, trace, warn};

use crate::budget::{
    estimate_bulk_delete_fields, estimate_bulk_update_fields, estimate_insert_fields, page_size,
    MAX_PLACEHOLDERS,
};
use crate::compiler::{
    build_bulk_delete, build_bulk_update, build_delete, build_empty_table, build_insert,
    build_update, split_keys,
};
use crate::config::{BulkConfig, Strategy};
use crate::connection::Executor;
use crate::error::{Error, Result, ValidationError};
use crate::paginate::{paginate, paginate_owned};
use crate::security::validate_table_name;
use crate::types::{CompiledQuery, Condition, Row};
use crate::unit::{UnitKind, UnitState, UnitTracker};

type Job = BoxFuture<'static, Result<u64>>;

/// A unit ready to run, or the reason it could not be compiled
type Unit = std::result::Result<Job, ValidationError>;

/// Outcome of a successful bulk call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Strategy that ran
    pub strategy: Strategy,
    /// Units dispatched (pages or rows)
    pub units: usize,
    /// Units that succeeded
    pub succeeded: usize,
    /// Rows submitted
    pub rows: usize,
    /// Rows affected as reported by the executor
    pub rows_affected: u64,
    /// Rows per unit (1 for per-row strategies)
    pub page_size: usize,
    /// Wall time of the call
    pub duration: Duration,
}

impl WriteSummary {
    /// Check if all units succeeded
    pub fn is_success(&self) -> bool {
        self.succeeded == self.units
    }
}

struct Outcome {
    units: usize,
    succeeded: usize,
    rows_affected: u64,
}

struct Plan<'a> {
    operation: &'static str,
    table: &'a str,
    strategy: Strategy,
    rows: usize,
    page_size: usize,
    started: Instant,
}

/// Reject a compiled unit that would exceed the placeholder ceiling
fn within_ceiling(
    compiled: std::result::Result<CompiledQuery, ValidationError>,
) -> std::result::Result<CompiledQuery, ValidationError> {
    let query = compiled?;
    let count = query.placeholder_count();
    if count > MAX_PLACEHOLDERS {
        return Err(ValidationError::PlaceholderLimit {
            count,
            limit: MAX_PLACEHOLDERS,
        });
    }
    Ok(query)
}

fn distinct_keys(keys: &[String]) -> usize {
    keys.iter().map(String::as_str).collect::<BTreeSet<_>>().len()
}

fn validate_batch(
    table: &str,
    rows: &[Row],
    keys: Option<&[String]>,
    field_count: Option<usize>,
) -> std::result::Result<(), ValidationError> {
    validate_table_name(table)?;
    if rows.is_empty() {
        return Err(ValidationError::EmptyRows);
    }
    if let Some(keys) = keys {
        if keys.is_empty() {
            return Err(ValidationError::EmptyKeys);
        }
    }
    if let Some(fields) = field_count {
        if fields == 0 {
            return Err(ValidationError::NonPositive {
                name: "field count",
            });
        }
        let key_count = keys.map_or(0, distinct_keys);
        if key_count > fields {
            return Err(ValidationError::KeysExceedFields {
                keys: key_count,
                fields,
            });
        }
    }
    Ok(())
}

/// Writes row sets through an [`Executor`]
pub struct BulkWriter<E> {
    executor: Arc<E>,
    config: BulkConfig,
}

impl<E> std::fmt::Debug for BulkWriter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkWriter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E: Executor + 'static> BulkWriter<E> {
    /// Create a writer, validating the configuration
    pub fn new(executor: E, config: BulkConfig) -> Result<Self> {
        Self::from_arc(Arc::new(executor), config)
    }

    /// Create a writer over a shared executor
    pub fn from_arc(executor: Arc<E>, config: BulkConfig) -> Result<Self> {
        config.ensure_valid()?;
        Ok(Self { executor, config })
    }

    /// Active configuration
    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Shared executor
    pub fn executor(&self) -> &Arc<E> {
        &self.executor
    }

    /// Insert `rows` in pages.
    ///
    /// The INSERT is compiled once from the first row and every page goes
    /// through [`Executor::exec_many`]. Pages are sized only by the
    /// placeholder ceiling; `max_batch_rows` does not apply.
    pub async fn create_bulk(
        &self,
        table: &str,
        rows: Vec<Row>,
        field_count: usize,
    ) -> Result<WriteSummary> {
        let started = Instant::now();
        validate_batch(table, &rows, None, Some(field_count))?;

        let sample = rows.first().ok_or(ValidationError::EmptyRows)?;
        let (sql, _) = build_insert(table, sample)?.into_parts();
        let sql: Arc<str> = Arc::from(sql);

        let total = rows.len();
        let size = page_size(total, estimate_insert_fields(total, field_count)?, None)?;
        let pages = paginate_owned(rows, size)?;

        info!(
            table = %table,
            rows = total,
            page_size = size,
            pages = pages.len(),
            workers = self.config.worker_count,
            "Starting bulk insert"
        );

        let units = pages
            .into_iter()
            .map(|page| {
                let executor = Arc::clone(&self.executor);
                let sql = Arc::clone(&sql);
                let job: Job = Box::pin(async move { executor.exec_many(&sql, &page).await });
                Ok(job)
            })
            .collect();

        let outcome = self.run_bounded(UnitKind::Page, units).await?;
        Ok(self.finish(
            Plan {
                operation: "insert",
                table,
                strategy: Strategy::BulkStatement,
                rows: total,
                page_size: size,
                started,
            },
            outcome,
        ))
    }

    /// Update `rows` matched by `key_columns` using `strategy`.
    ///
    /// `field_count` is the number of columns per row, key columns included;
    /// it sizes pages for [`Strategy::BulkStatement`].
    pub async fn update_bulk(
        &self,
        table: &str,
        rows: Vec<Row>,
        key_columns: &[String],
        field_count: usize,
        strategy: Strategy,
    ) -> Result<WriteSummary> {
        let started = Instant::now();
        validate_batch(table, &rows, Some(key_columns), Some(field_count))?;
        let total = rows.len();

        let (size, outcome) = match strategy {
            Strategy::BulkStatement => {
                let estimate =
                    estimate_bulk_update_fields(total, field_count, distinct_keys(key_columns))?;
                let size = page_size(total, estimate, Some(self.config.max_batch_rows))?;
                let pages = paginate(&rows, size)?;
                self.log_start("update", table, strategy, total, size, pages.len());

                let units = pages
                    .iter()
                    .map(|page| self.statement_unit(build_bulk_update(table, page, key_columns)))
                    .collect();
                (size, self.run_bounded(UnitKind::Page, units).await?)
            }
            Strategy::ParallelRows => {
                self.log_start("update", table, strategy, total, 1, total);
                let units = rows
                    .into_iter()
                    .enumerate()
                    .map(|(index, row)| {
                        self.statement_unit(split_keys(row, key_columns, index).and_then(
                            |(values, condition)| build_update(table, &values, &condition),
                        ))
                    })
                    .collect();
                (1, self.run_bounded(UnitKind::Row, units).await?)
            }
            Strategy::SequentialRows => {
                self.log_start("update", table, strategy, total, 1, total);
                let outcome = self
                    .run_sequential(rows, |index, row| {
                        let (values, condition) = split_keys(row, key_columns, index)?;
                        build_update(table, &values, &condition)
                    })
                    .await?;
                (1, outcome)
            }
        };

        Ok(self.finish(
            Plan {
                operation: "update",
                table,
                strategy,
                rows: total,
                page_size: size,
                started,
            },
            outcome,
        ))
    }

    /// [`update_bulk`](Self::update_bulk) with the configured strategy
    pub async fn update_bulk_default(
        &self,
        table: &str,
        rows: Vec<Row>,
        key_columns: &[String],
        field_count: usize,
    ) -> Result<WriteSummary> {
        self.update_bulk(table, rows, key_columns, field_count, self.config.strategy)
            .await
    }

    /// Delete the records matching each row's `key_columns`.
    ///
    /// Non-key columns of the rows are ignored.
    pub async fn delete_bulk(
        &self,
        table: &str,
        rows: Vec<Row>,
        key_columns: &[String],
        strategy: Strategy,
    ) -> Result<WriteSummary> {
        let started = Instant::now();
        validate_batch(table, &rows, Some(key_columns), None)?;
        let total = rows.len();

        let (size, outcome) = match strategy {
            Strategy::BulkStatement => {
                let estimate = estimate_bulk_delete_fields(total, distinct_keys(key_columns))?;
                let size = page_size(total, estimate, Some(self.config.max_batch_rows))?;
                let pages = paginate(&rows, size)?;
                self.log_start("delete", table, strategy, total, size, pages.len());

                let units = pages
                    .iter()
                    .map(|page| self.statement_unit(build_bulk_delete(table, page, key_columns)))
                    .collect();
                (size, self.run_bounded(UnitKind::Page, units).await?)
            }
            Strategy::ParallelRows => {
                self.log_start("delete", table, strategy, total, 1, total);
                let units = rows
                    .into_iter()
                    .enumerate()
                    .map(|(index, row)| {
                        self.statement_unit(
                            split_keys(row, key_columns, index)
                                .and_then(|(_, condition)| build_delete(table, &condition)),
                        )
                    })
                    .collect();
                (1, self.run_bounded(UnitKind::Row, units).await?)
            }
            Strategy::SequentialRows => {
                self.log_start("delete", table, strategy, total, 1, total);
                let outcome = self
                    .run_sequential(rows, |index, row| {
                        let (_, condition) = split_keys(row, key_columns, index)?;
                        build_delete(table, &condition)
                    })
                    .await?;
                (1, outcome)
            }
        };

        Ok(self.finish(
            Plan {
                operation: "delete",
                table,
                strategy,
                rows: total,
                page_size: size,
                started,
            },
            outcome,
        ))
    }

    /// Update the records matching `condition` with `payload`
    pub async fn update(&self, table: &str, payload: &Row, condition: &Condition) -> Result<u64> {
        let query = within_ceiling(build_update(table, payload, condition))?;
        self.exec_single(query).await
    }

    /// Delete the records matching `condition`
    pub async fn delete(&self, table: &str, condition: &Condition) -> Result<u64> {
        let query = within_ceiling(build_delete(table, condition))?;
        self.exec_single(query).await
    }

    /// Delete every record in `table`
    pub async fn empty_table(&self, table: &str) -> Result<u64> {
        let query = build_empty_table(table)?;
        self.exec_single(query).await
    }

    /// Close the underlying executor
    pub async fn close(&self) -> Result<()> {
        self.executor.close().await
    }

    async fn exec_single(&self, query: CompiledQuery) -> Result<u64> {
        let (sql, binds) = query.into_parts();
        let affected = self.executor.exec(&sql, &binds).await?;
        debug!(sql = %sql, rows_affected = affected, "Statement executed");
        Ok(affected)
    }

    fn statement_unit(&self, compiled: std::result::Result<CompiledQuery, ValidationError>) -> Unit {
        let query = within_ceiling(compiled)?;
        let executor = Arc::clone(&self.executor);
        let job: Job = Box::pin(async move {
            let (sql, binds) = query.into_parts();
            executor.exec(&sql, &binds).await
        });
        Ok(job)
    }

    /// Run units on the worker pool and wait for all of them
    async fn run_bounded(&self, kind: UnitKind, units: Vec<Unit>) -> Result<Outcome> {
        let workers = self.config.worker_count;
        let barrier_permits = u32::try_from(workers)
            .map_err(|_| Error::config(format!("worker count {} is too large", workers)))?;

        let semaphore = Arc::new(Semaphore::new(workers));
        let tracker = Arc::new(UnitTracker::new(units.len()));
        let affected = Arc::new(AtomicU64::new(0));
        // each unit reports at most one error, so try_send never sees a full queue
        let (tx, mut rx) = mpsc::channel::<Error>(units.len().max(1));

        for (index, unit) in units.into_iter().enumerate() {
            let job = match unit {
                Ok(job) => job,
                Err(source) => {
                    tracker.fail(index);
                    let err = Error::compile(kind, index, source);
                    warn!(unit = %kind, index, error = %err, "Unit failed to compile");
                    let _ = tx.try_send(err);
                    continue;
                }
            };

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| Error::internal("worker pool closed"))?;
            let tracker = Arc::clone(&tracker);
            let affected = Arc::clone(&affected);
            let tx = tx.clone();

            tokio::spawn(async move {
                tracker.start(index);
                trace!(unit = %kind, index, "Unit started");

                match job.await {
                    Ok(rows) => {
                        affected.fetch_add(rows, Ordering::Relaxed);
                        tracker.succeed(index);
                        debug!(unit = %kind, index, rows_affected = rows, "Unit succeeded");
                    }
                    Err(source) => {
                        tracker.fail(index);
                        let err = Error::execution(kind, index, source);
                        warn!(unit = %kind, index, error = %err, "Unit failed");
                        let _ = tx.try_send(err);
                    }
                }
                drop(permit);
            });
        }
        drop(tx);

        let _barrier = semaphore
            .acquire_many(barrier_permits)
            .await
            .map_err(|_| Error::internal("worker pool closed"))?;

        if let Ok(first) = rx.try_recv() {
            let mut discarded = 0usize;
            while rx.try_recv().is_ok() {
                discarded += 1;
            }
            if discarded > 0 {
                warn!(unit = %kind, discarded, "Discarded errors from other failed units");
            }
            return Err(first);
        }

        if let Some(index) = tracker.first_unfinished() {
            return Err(Error::internal(format!(
                "{} {} did not finish",
                kind, index
            )));
        }

        Ok(Outcome {
            units: tracker.len(),
            succeeded: tracker.count(UnitState::Succeeded),
            rows_affected: affected.load(Ordering::Relaxed),
        })
    }

    /// Run one row at a time in input order, stopping at the first failure
    async fn run_sequential<F>(&self, rows: Vec<Row>, mut compile: F) -> Result<Outcome>
    where
        F: FnMut(usize, Row) -> std::result::Result<CompiledQuery, ValidationError>,
    {
        let tracker = UnitTracker::new(rows.len());
        let mut affected = 0u64;

        for (index, row) in rows.into_iter().enumerate() {
            tracker.start(index);
            trace!(unit = %UnitKind::Row, index, "Unit started");

            let result = match within_ceiling(compile(index, row)) {
                Ok(query) => {
                    let (sql, binds) = query.into_parts();
                    self.executor.exec(&sql, &binds).await
                }
                Err(source) => Err(Error::compile(UnitKind::Row, index, source)),
            };

            match result {
                Ok(rows) => {
                    affected += rows;
                    tracker.succeed(index);
                    debug!(unit = %UnitKind::Row, index, rows_affected = rows, "Unit succeeded");
                }
                Err(err) => {
                    tracker.fail(index);
                    error!(index, error = %err, "Sequential write stopped");
                    return Err(Error::stopped(index, err));
                }
            }
        }

        Ok(Outcome {
            units: tracker.len(),
            succeeded: tracker.count(UnitState::Succeeded),
            rows_affected: affected,
        })
    }

    /// Units in flight at once under `strategy`
    fn workers_for(&self, strategy: Strategy) -> usize {
        if strategy.is_concurrent() {
            self.config.worker_count
        } else {
            1
        }
    }

    fn log_start(
        &self,
        operation: &str,
        table: &str,
        strategy: Strategy,
        rows: usize,
        page_size: usize,
        pages: usize,
    ) {
        info!(
            table = %table,
            rows,
            page_size,
            pages,
            strategy = %strategy,
            workers = self.workers_for(strategy),
            "Starting bulk {}",
            operation
        );
    }

    fn finish(&self, plan: Plan<'_>, outcome: Outcome) -> WriteSummary {
        let duration = plan.started.elapsed();
        info!(
            table = %plan.table,
            units = outcome.units,
            rows_affected = outcome.rows_affected,
            elapsed_ms = duration.as_millis() as u64,
            "Bulk {} completed",
            plan.operation
        );

        WriteSummary {
            strategy: plan.strategy,
            units: outcome.units,
            succeeded: outcome.succeeded,
            rows: plan.rows,
            rows_affected: outcome.rows_affected,
            page_size: plan.page_size,
            duration,
        }
    }
}
