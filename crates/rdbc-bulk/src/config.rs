//! Bulk writer configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::error::{Error, Result};

/// How a batch of rows maps to statements
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One statement per page, pages run concurrently
    #[default]
    BulkStatement,
    /// One statement per row, rows run concurrently
    ParallelRows,
    /// One statement per row, in input order, stopping at the first failure
    SequentialRows,
}

impl Strategy {
    /// Whether units run on the worker pool
    #[inline]
    pub const fn is_concurrent(self) -> bool {
        !matches!(self, Self::SequentialRows)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BulkStatement => write!(f, "bulk_statement"),
            Self::ParallelRows => write!(f, "parallel_rows"),
            Self::SequentialRows => write!(f, "sequential_rows"),
        }
    }
}

/// Bulk writer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct BulkConfig {
    /// Maximum units executing at once (default: 4)
    #[serde(default = "default_worker_count")]
    #[validate(range(min = 1, max = 1024))]
    pub worker_count: usize,

    /// Upper bound on rows per page for bulk update and delete (default: 1000)
    ///
    /// Pages are additionally sized so that no statement exceeds the
    /// placeholder ceiling.
    #[serde(default = "default_max_batch_rows")]
    #[validate(range(min = 1))]
    pub max_batch_rows: usize,

    /// Strategy used by [`update_bulk_default`](crate::executor::BulkWriter::update_bulk_default)
    #[serde(default)]
    pub strategy: Strategy,
}

fn default_worker_count() -> usize {
    4
}

fn default_max_batch_rows() -> usize {
    1000
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            max_batch_rows: default_max_batch_rows(),
            strategy: Strategy::default(),
        }
    }
}

impl BulkConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set worker count
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    /// Set the per-page row cap
    pub fn with_max_batch_rows(mut self, rows: usize) -> Self {
        self.max_batch_rows = rows;
        self
    }

    /// Set default strategy
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Run field validation, reporting failures as [`Error::Configuration`]
    pub fn ensure_valid(&self) -> Result<()> {
        self.validate().map_err(|e| Error::config(e.to_string()))
    }
}
