//! Error types for rdbc-bulk
//!
//! Two layers:
//! - ValidationError: bad input detected before any SQL is sent
//! - Error: crate-wide error, tagged with the page or row it came from

use std::fmt;
use thiserror::Error;

use crate::unit::UnitKind;

/// Result type for rdbc-bulk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Input validation failures raised by the compiler, budgeter and paginator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ValidationError {
    /// Table name is empty
    #[error("table is empty")]
    EmptyTable,

    /// No rows to write
    #[error("rows are empty")]
    EmptyRows,

    /// No key columns given
    #[error("key set is empty")]
    EmptyKeys,

    /// Update payload has no columns
    #[error("payload is empty")]
    EmptyPayload,

    /// Sample row has no columns
    #[error("row has no columns")]
    EmptyColumns,

    /// Condition has no usable predicate
    #[error("condition is empty")]
    EmptyCondition,

    /// Rows carry only key columns
    #[error("no columns to update besides the key columns")]
    NoUpdatableColumns,

    /// A row lacks one of the key columns
    #[error("row {row} is missing key column '{key}'")]
    MissingKey { row: usize, key: String },

    /// Table or column name is not a plain SQL identifier
    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// A size input is zero
    #[error("{name} must be at least 1")]
    NonPositive { name: &'static str },

    /// More key columns than fields per row
    #[error("key count {keys} exceeds field count {fields}")]
    KeysExceedFields { keys: usize, fields: usize },

    /// Statement would exceed the placeholder ceiling
    #[error("statement needs {count} placeholders, limit is {limit}")]
    PlaceholderLimit { count: usize, limit: usize },

    /// Field estimate does not fit in usize
    #[error("placeholder estimate overflowed")]
    BudgetOverflow,
}

impl ValidationError {
    pub(crate) fn invalid_identifier(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Input rejected before dispatch
    Validation,
    /// A unit failed to compile
    Compile,
    /// A unit failed while executing
    Execution,
    /// Statement rejected by the database
    Query,
    /// Connection-related errors (retriable)
    Connection,
    /// Named parameters could not be bound
    Binding,
    /// Configuration error
    Configuration,
    /// Unknown/other errors
    Internal,
}

impl ErrorCategory {
    /// Whether errors in this category are generally retriable
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(self, Self::Connection)
    }
}

/// Main error type for rdbc-bulk
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// Whole call rejected before any unit was built
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A single unit could not be compiled and was never sent
    #[error("failed to compile {unit} {index}: {source}")]
    Compile {
        unit: UnitKind,
        index: usize,
        #[source]
        source: ValidationError,
    },

    /// A single unit failed in the execution primitive
    #[error("failed to execute {unit} {index}: {source}")]
    Execution {
        unit: UnitKind,
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// Sequential execution stopped; rows after `index` were not processed
    #[error("stopped at row {index}: {source}")]
    Stopped {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// Query execution failed
    #[error("query error: {message}")]
    Query {
        message: String,
        sql: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection failed
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Named parameters could not be rewritten
    #[error("binding error: {message}")]
    Binding { message: String },

    /// Configuration error
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Internal error
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Compile { .. } => ErrorCategory::Compile,
            Self::Execution { .. } | Self::Stopped { .. } => ErrorCategory::Execution,
            Self::Query { .. } => ErrorCategory::Query,
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::Binding { .. } => ErrorCategory::Binding,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether this error is retriable
    ///
    /// Wrapped errors inherit the retriability of the failure they carry.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Execution { source, .. } | Self::Stopped { source, .. } => source.is_retriable(),
            other => other.category().is_retriable(),
        }
    }

    /// Unit kind and index this error is tagged with, if any
    pub fn unit(&self) -> Option<(UnitKind, usize)> {
        match self {
            Self::Compile { unit, index, .. } | Self::Execution { unit, index, .. } => {
                Some((*unit, *index))
            }
            Self::Stopped { index, .. } => Some((UnitKind::Row, *index)),
            _ => None,
        }
    }

    /// Create a compile error for a unit
    pub fn compile(unit: UnitKind, index: usize, source: ValidationError) -> Self {
        Self::Compile {
            unit,
            index,
            source,
        }
    }

    /// Create an execution error for a unit
    pub fn execution(unit: UnitKind, index: usize, source: Error) -> Self {
        Self::Execution {
            unit,
            index,
            source: Box::new(source),
        }
    }

    /// Create a stopped-at-row error
    pub fn stopped(index: usize, source: Error) -> Self {
        Self::Stopped {
            index,
            source: Box::new(source),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create a query error with SQL
    pub fn query_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a binding error
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Compile => write!(f, "compile"),
            Self::Execution => write!(f, "execution"),
            Self::Query => write!(f, "query"),
            Self::Connection => write!(f, "connection"),
            Self::Binding => write!(f, "binding"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
