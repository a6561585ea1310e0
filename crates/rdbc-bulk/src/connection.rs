//! Execution traits for rdbc-bulk
//!
//! - Executor: the primitive the bulk writer drives, speaking named binds
//! - Connection: a positional driver connection (`$1`, `?`, `@p1`)
//! - PositionalExecutor: adapts a Connection into an Executor

use async_trait::async_trait;
use tracing::trace;

use crate::bind::bind_named;
use crate::dialect::ParamStyle;
use crate::error::Result;
use crate::types::{BindSet, Row, Value};

/// Executes compiled statements with named binds.
///
/// Implementations are shared across worker tasks and must tolerate
/// concurrent callers.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute one statement, returns affected row count
    async fn exec(&self, sql: &str, binds: &BindSet) -> Result<u64>;

    /// Execute the same statement once per row, each row serving as the bind
    /// set. Returns the summed affected row count.
    async fn exec_many(&self, sql: &str, rows: &[Row]) -> Result<u64> {
        let mut total = 0;
        for row in rows {
            total += self.exec(sql, row).await?;
        }
        Ok(total)
    }

    /// Release underlying resources
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A connection to a database taking positional parameters
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute a query that modifies data, returns affected row count
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute a batch of statements, returns affected counts per statement
    async fn execute_batch(&self, statements: &[(&str, &[Value])]) -> Result<Vec<u64>> {
        let mut results = Vec::with_capacity(statements.len());
        for (sql, params) in statements {
            results.push(self.execute(sql, params).await?);
        }
        Ok(results)
    }

    /// Database behind this connection
    fn database_type(&self) -> DatabaseType;

    /// Close the connection
    async fn close(&self) -> Result<()>;
}

/// Database type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    /// PostgreSQL
    PostgreSQL,
    /// MySQL/MariaDB
    MySQL,
    /// SQL Server
    SqlServer,
    /// SQLite
    SQLite,
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PostgreSQL => write!(f, "PostgreSQL"),
            Self::MySQL => write!(f, "MySQL"),
            Self::SqlServer => write!(f, "SQL Server"),
            Self::SQLite => write!(f, "SQLite"),
        }
    }
}

/// [`Executor`] over a positional [`Connection`].
///
/// Named binds are rewritten with [`bind_named`] in the connection's
/// parameter style before each call.
#[derive(Debug)]
pub struct PositionalExecutor<C> {
    conn: C,
    style: ParamStyle,
}

impl<C: Connection> PositionalExecutor<C> {
    /// Wrap a connection, using its database's native parameter style
    pub fn new(conn: C) -> Self {
        let style = ParamStyle::for_database(conn.database_type());
        Self { conn, style }
    }

    /// Wrap a connection with an explicit parameter style
    pub fn with_style(conn: C, style: ParamStyle) -> Self {
        Self { conn, style }
    }

    /// Parameter style in use
    pub fn style(&self) -> ParamStyle {
        self.style
    }

    /// Underlying connection
    pub fn connection(&self) -> &C {
        &self.conn
    }
}

#[async_trait]
impl<C: Connection> Executor for PositionalExecutor<C> {
    async fn exec(&self, sql: &str, binds: &BindSet) -> Result<u64> {
        let (sql, params) = bind_named(sql, binds, self.style)?;
        trace!(sql = %sql, params = params.len(), "Executing statement");
        self.conn.execute(&sql, &params).await
    }

    async fn exec_many(&self, sql: &str, rows: &[Row]) -> Result<u64> {
        let bound = rows
            .iter()
            .map(|row| bind_named(sql, row, self.style))
            .collect::<Result<Vec<_>>>()?;
        let statements: Vec<(&str, &[Value])> = bound
            .iter()
            .map(|(sql, params)| (sql.as_str(), params.as_slice()))
            .collect();

        trace!(sql = %sql, rows = statements.len(), "Executing statement batch");
        let counts = self.conn.execute_batch(&statements).await?;
        Ok(counts.iter().sum())
    }

    async fn close(&self) -> Result<()> {
        self.conn.close().await
    }
}
