//! # rdbc-bulk
//!
//! Bulk write engine for relational databases.
//!
//! Takes a set of rows and writes them as few statements as the database's
//! placeholder ceiling allows, running the statements on a bounded pool of
//! workers.
//!
//! ## Features
//!
//! - **Query Compiler**: deterministic INSERT, CASE-based bulk UPDATE, keyed DELETE
//! - **Placeholder Budgeting**: pages sized to stay under 65535 bind parameters
//! - **Strategies**: one statement per page, parallel per-row, or sequential per-row
//! - **Bounded Concurrency**: semaphore-limited workers with first-error reporting
//! - **Positional Binding**: `:name` rewritten to `$1`, `?` or `@p1`, with IN-list expansion
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rdbc_bulk::prelude::*;
//!
//! let writer = BulkWriter::new(PositionalExecutor::new(conn), BulkConfig::default())?;
//!
//! // One CASE-based UPDATE per page
//! let summary = writer
//!     .update_bulk("users", rows, &["id".to_string()], 4, Strategy::BulkStatement)
//!     .await?;
//! println!("{} rows affected in {:?}", summary.rows_affected, summary.duration);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod bind;
pub mod budget;
pub mod compiler;
pub mod config;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod paginate;
pub mod security;
pub mod testing;
pub mod types;
pub mod unit;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result, ValidationError};

    // Value and row types
    pub use crate::types::{BindSet, CompiledQuery, Condition, Row, Value};

    // Execution traits
    pub use crate::connection::{Connection, DatabaseType, Executor, PositionalExecutor};
    pub use crate::dialect::ParamStyle;

    // Writer
    pub use crate::config::{BulkConfig, Strategy};
    pub use crate::executor::{BulkWriter, WriteSummary};
    pub use crate::unit::{UnitKind, UnitState};

    // Compiler and budget
    pub use crate::budget::MAX_PLACEHOLDERS;
    pub use crate::compiler::{
        build_bulk_delete, build_bulk_update, build_condition, build_delete, build_empty_table,
        build_insert, build_update, split_keys,
    };
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use executor::BulkWriter;
pub use types::Value;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _value = Value::Int32(42);
        let _config = BulkConfig::default();
        let _strategy = Strategy::ParallelRows;
        let _style = ParamStyle::for_database(DatabaseType::PostgreSQL);
    }

    #[test]
    fn test_error_types() {
        let err = Error::connection("test error");
        assert!(err.is_retriable());
        assert_eq!(err.category(), ErrorCategory::Connection);

        let err: Error = ValidationError::EmptyRows.into();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_value_types() {
        let v = Value::from(42_i32);
        assert!(!v.is_null());
        assert_eq!(v.as_i64(), Some(42));

        let v = Value::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
    }

    #[test]
    fn test_compile_example() {
        let rows: Vec<Row> = vec![
            Row::from([
                ("id".to_string(), Value::from(1)),
                ("name".to_string(), Value::from("A")),
                ("age".to_string(), Value::from(1)),
            ]),
            Row::from([
                ("id".to_string(), Value::from(2)),
                ("name".to_string(), Value::from("B")),
                ("age".to_string(), Value::from(2)),
                ("address".to_string(), Value::from("X")),
            ]),
        ];

        let query = build_bulk_update("user", &rows, &["id".to_string()]).unwrap();
        assert!(query.sql().ends_with("WHERE id IN (:id_0, :id_1)"));
        assert!(query.binds().contains_key("address_1"));
        assert!(!query.binds().contains_key("address_0"));
        assert!(query.placeholder_count() <= MAX_PLACEHOLDERS);
    }
}
