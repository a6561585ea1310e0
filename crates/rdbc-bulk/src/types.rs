//! Value types for rdbc-bulk
//!
//! - Value: closed set of scalar SQL values plus arrays (used for `IN` lists)
//! - Row / BindSet / Condition: column and parameter maps with lexicographic order
//! - CompiledQuery: SQL text paired with its named binds

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// SQL value that can be bound to a placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// 8-bit signed integer (TINYINT)
    Int8(i8),
    /// 16-bit signed integer (SMALLINT)
    Int16(i16),
    /// 32-bit signed integer (INTEGER)
    Int32(i32),
    /// 64-bit signed integer (BIGINT)
    Int64(i64),
    /// 32-bit floating point (REAL)
    Float32(f32),
    /// 64-bit floating point (DOUBLE PRECISION)
    Float64(f64),
    /// Arbitrary precision decimal (NUMERIC, DECIMAL)
    Decimal(Decimal),
    /// Text string (VARCHAR, TEXT, CHAR)
    String(String),
    /// Binary data (BYTEA, BLOB, VARBINARY)
    Bytes(Vec<u8>),
    /// Date without time (DATE)
    Date(NaiveDate),
    /// Time without date (TIME)
    Time(NaiveTime),
    /// Timestamp without timezone (TIMESTAMP)
    DateTime(NaiveDateTime),
    /// Timestamp with timezone (TIMESTAMPTZ)
    DateTimeTz(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
    /// JSON value
    Json(serde_json::Value),
    /// Sequence of values, rendered as an `IN (...)` list when bound
    Array(Vec<Value>),
}

impl Value {
    /// Check if value is NULL
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if value is a sequence
    #[inline]
    pub const fn is_sequence(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Check if value is a sequence with no elements
    #[inline]
    pub fn is_empty_sequence(&self) -> bool {
        matches!(self, Self::Array(items) if items.is_empty())
    }

    /// Number of positional placeholders this value occupies once bound
    #[inline]
    pub fn placeholder_width(&self) -> usize {
        match self {
            Self::Array(items) => items.len(),
            _ => 1,
        }
    }

    /// Try to convert to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int8(n) => Some(i64::from(*n)),
            Self::Int16(n) => Some(i64::from(*n)),
            Self::Int32(n) => Some(i64::from(*n)),
            Self::Int64(n) => Some(*n),
            Self::Decimal(d) => d.to_string().parse().ok(),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Try to view as a sequence
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Build a sequence value from anything convertible
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::Int8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTimeTz(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Self::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::array(v)
    }
}

/// One record to write, keyed by column name.
///
/// `BTreeMap` keeps columns in lexicographic order, which is the order the
/// compiler emits them in.
pub type Row = BTreeMap<String, Value>;

/// Named bind parameters produced by the compiler
pub type BindSet = BTreeMap<String, Value>;

/// Column equality conditions for single-row update/delete.
///
/// [`Value::Array`] entries become `IN` predicates; empty arrays are skipped.
pub type Condition = BTreeMap<String, Value>;

/// SQL text with named `:placeholders` and the values bound to them
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    sql: String,
    binds: BindSet,
}

impl CompiledQuery {
    /// Create a compiled query
    pub fn new(sql: impl Into<String>, binds: BindSet) -> Self {
        Self {
            sql: sql.into(),
            binds,
        }
    }

    /// SQL text
    #[inline]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Named binds
    #[inline]
    pub fn binds(&self) -> &BindSet {
        &self.binds
    }

    /// Positional placeholders this query binds to.
    ///
    /// Every occurrence in the SQL text counts, and array binds count once per
    /// element.
    pub fn placeholder_count(&self) -> usize {
        crate::bind::count_placeholders(&self.sql, &self.binds)
    }

    /// Split into SQL text and binds
    pub fn into_parts(self) -> (String, BindSet) {
        (self.sql, self.binds)
    }
}
