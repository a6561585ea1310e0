//! SQL compilation for bulk writes
//!
//! Turns rows into SQL text with named `:placeholders` plus the matching
//! [`BindSet`]. Columns and keys are always visited in lexicographic order so
//! the same input compiles to byte-identical output.
//!
//! Bind naming:
//! - insert: `:column`
//! - bulk update / bulk delete: `:column_<row index>`
//! - single update: `:val_column` for SET, `:cond_key` for WHERE
//!
//! ```
//! use rdbc_bulk::compiler::build_bulk_update;
//! use rdbc_bulk::types::{Row, Value};
//!
//! let rows = vec![
//!     Row::from([("id".to_string(), Value::from(1)), ("age".to_string(), Value::from(30))]),
//!     Row::from([("id".to_string(), Value::from(2)), ("age".to_string(), Value::from(40))]),
//! ];
//! let query = build_bulk_update("users", &rows, &["id".to_string()]).unwrap();
//! assert_eq!(
//!     query.sql(),
//!     "UPDATE users SET age = (CASE WHEN id = :id_0 THEN :age_0 WHEN id = :id_1 THEN :age_1 ELSE age END) WHERE id IN (:id_0, :id_1)"
//! );
//! ```

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::security::{validate_sql_identifier, validate_table_name};
use crate::types::{BindSet, CompiledQuery, Condition, Row};

/// Sort, de-duplicate and validate a key set
fn normalize_keys(keys: &[String]) -> Result<Vec<&str>, ValidationError> {
    if keys.is_empty() {
        return Err(ValidationError::EmptyKeys);
    }

    let mut sorted: Vec<&str> = keys.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    for key in &sorted {
        validate_sql_identifier(key)?;
    }
    Ok(sorted)
}

fn row_bind(column: &str, index: usize) -> String {
    format!("{}_{}", column, index)
}

/// Build an INSERT shaped from the columns of `sample`.
///
/// The statement is reused for every row of a batch; binds hold the sample's
/// own values.
pub fn build_insert(table: &str, sample: &Row) -> Result<CompiledQuery, ValidationError> {
    validate_table_name(table)?;
    if sample.is_empty() {
        return Err(ValidationError::EmptyColumns);
    }

    let mut columns = Vec::with_capacity(sample.len());
    let mut placeholders = Vec::with_capacity(sample.len());
    let mut binds = BindSet::new();

    for (column, value) in sample {
        validate_sql_identifier(column)?;
        columns.push(column.as_str());
        placeholders.push(format!(":{}", column));
        binds.insert(column.clone(), value.clone());
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(CompiledQuery::new(sql, binds))
}

/// Build one UPDATE for the whole batch using per-column CASE expressions.
///
/// For every non-key column present in any row:
/// `column = (CASE WHEN <keys of row i> THEN :column_i ... ELSE column END)`.
/// The WHERE clause is `key IN (:key_0, :key_1, ...)` per key, AND-joined.
/// A row only contributes CASE arms for the columns it carries.
pub fn build_bulk_update(
    table: &str,
    rows: &[Row],
    key_set: &[String],
) -> Result<CompiledQuery, ValidationError> {
    validate_table_name(table)?;
    if rows.is_empty() {
        return Err(ValidationError::EmptyRows);
    }
    let keys = normalize_keys(key_set)?;

    let mut binds = BindSet::new();
    let mut arms: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    let mut key_params: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); keys.len()];

    for (index, row) in rows.iter().enumerate() {
        let mut predicate = Vec::with_capacity(keys.len());
        for (position, key) in keys.iter().enumerate() {
            let value = row.get(*key).ok_or_else(|| ValidationError::MissingKey {
                row: index,
                key: (*key).to_string(),
            })?;
            let bind = row_bind(key, index);
            predicate.push(format!("{} = :{}", key, bind));
            key_params[position].push(format!(":{}", bind));
            binds.insert(bind, value.clone());
        }
        let predicate = predicate.join(" AND ");

        for (column, value) in row {
            if keys.binary_search(&column.as_str()).is_ok() {
                continue;
            }

            let whens = match arms.entry(column.as_str()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    validate_sql_identifier(column)?;
                    entry.insert(Vec::new())
                }
            };

            let bind = row_bind(column, index);
            whens.push(format!("WHEN {} THEN :{}", predicate, bind));
            binds.insert(bind, value.clone());
        }
    }

    if arms.is_empty() {
        return Err(ValidationError::NoUpdatableColumns);
    }

    let set_clause = arms
        .iter()
        .map(|(column, whens)| {
            format!("{} = (CASE {} ELSE {} END)", column, whens.join(" "), column)
        })
        .collect::<Vec<_>>()
        .join(", ");

    let where_clause = keys
        .iter()
        .zip(&key_params)
        .map(|(key, params)| format!("{} IN ({})", key, params.join(", ")))
        .collect::<Vec<_>>()
        .join(" AND ");

    let sql = format!("UPDATE {} SET {} WHERE {}", table, set_clause, where_clause);
    Ok(CompiledQuery::new(sql, binds))
}

/// Build one DELETE matching every row of the batch by its key columns.
///
/// `DELETE FROM t WHERE (a = :a_0 AND b = :b_0) OR (a = :a_1 AND b = :b_1)`.
/// Non-key columns are ignored.
pub fn build_bulk_delete(
    table: &str,
    rows: &[Row],
    key_set: &[String],
) -> Result<CompiledQuery, ValidationError> {
    validate_table_name(table)?;
    if rows.is_empty() {
        return Err(ValidationError::EmptyRows);
    }
    let keys = normalize_keys(key_set)?;

    let mut binds = BindSet::new();
    let mut predicates = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let mut predicate = Vec::with_capacity(keys.len());
        for key in &keys {
            let value = row.get(*key).ok_or_else(|| ValidationError::MissingKey {
                row: index,
                key: (*key).to_string(),
            })?;
            let bind = row_bind(key, index);
            predicate.push(format!("{} = :{}", key, bind));
            binds.insert(bind, value.clone());
        }
        predicates.push(format!("({})", predicate.join(" AND ")));
    }

    let sql = format!("DELETE FROM {} WHERE {}", table, predicates.join(" OR "));
    Ok(CompiledQuery::new(sql, binds))
}

/// Build a single-row UPDATE: `UPDATE t SET col = :val_col WHERE <condition>`
pub fn build_update(
    table: &str,
    payload: &Row,
    condition: &Condition,
) -> Result<CompiledQuery, ValidationError> {
    validate_table_name(table)?;
    if payload.is_empty() {
        return Err(ValidationError::EmptyPayload);
    }
    if condition.is_empty() {
        return Err(ValidationError::EmptyCondition);
    }

    let mut binds = BindSet::new();
    let mut fields = Vec::with_capacity(payload.len());
    for (column, value) in payload {
        validate_sql_identifier(column)?;
        let bind = format!("val_{}", column);
        fields.push(format!("{} = :{}", column, bind));
        binds.insert(bind, value.clone());
    }

    let (where_clause, condition_binds) = build_condition(condition)?.into_parts();
    binds.extend(condition_binds);

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        fields.join(", "),
        where_clause
    );
    Ok(CompiledQuery::new(sql, binds))
}

/// Build a DELETE: `DELETE FROM t WHERE <condition>`
pub fn build_delete(table: &str, condition: &Condition) -> Result<CompiledQuery, ValidationError> {
    validate_table_name(table)?;
    if condition.is_empty() {
        return Err(ValidationError::EmptyCondition);
    }

    let (where_clause, binds) = build_condition(condition)?.into_parts();
    let sql = format!("DELETE FROM {} WHERE {}", table, where_clause);
    Ok(CompiledQuery::new(sql, binds))
}

/// Build a `DELETE FROM t` that clears the whole table
pub fn build_empty_table(table: &str) -> Result<CompiledQuery, ValidationError> {
    validate_table_name(table)?;
    Ok(CompiledQuery::new(
        format!("DELETE FROM {}", table),
        BindSet::new(),
    ))
}

/// Build an AND-joined predicate from a condition map.
///
/// Scalars become `key = :cond_key`, arrays become `key IN (:cond_key)`, and
/// empty arrays are skipped. The returned text is the predicate alone, without
/// a `WHERE` keyword.
pub fn build_condition(condition: &Condition) -> Result<CompiledQuery, ValidationError> {
    let mut binds = BindSet::new();
    let mut predicates = Vec::with_capacity(condition.len());

    for (key, value) in condition {
        if value.is_empty_sequence() {
            continue;
        }
        validate_sql_identifier(key)?;

        let bind = format!("cond_{}", key);
        if value.is_sequence() {
            predicates.push(format!("{} IN (:{})", key, bind));
        } else {
            predicates.push(format!("{} = :{}", key, bind));
        }
        binds.insert(bind, value.clone());
    }

    if predicates.is_empty() {
        return Err(ValidationError::EmptyCondition);
    }

    Ok(CompiledQuery::new(predicates.join(" AND "), binds))
}

/// Split a row into its value columns and a key condition.
///
/// The row is consumed: key columns are moved out of it into the condition.
/// `index` is only used to name the row in a [`ValidationError::MissingKey`].
pub fn split_keys(
    mut row: Row,
    keys: &[String],
    index: usize,
) -> Result<(Row, Condition), ValidationError> {
    if keys.is_empty() {
        return Err(ValidationError::EmptyKeys);
    }

    let mut condition = Condition::new();
    for key in keys {
        if condition.contains_key(key) {
            continue;
        }
        let value = row.remove(key).ok_or_else(|| ValidationError::MissingKey {
            row: index,
            key: key.clone(),
        })?;
        condition.insert(key.clone(), value);
    }
    Ok((row, condition))
}
