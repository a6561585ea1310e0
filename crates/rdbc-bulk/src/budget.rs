//! Placeholder budget arithmetic
//!
//! A statement may carry at most [`MAX_PLACEHOLDERS`] positional parameters.
//! The functions here estimate how many placeholders a batch needs and derive
//! the largest page of rows that stays under the ceiling. Every repeated
//! occurrence of a named bind counts, since the binding layer emits one
//! positional parameter per occurrence.

use crate::error::ValidationError;

/// Placeholder ceiling for a single statement (`u16::MAX`, the MySQL and
/// PostgreSQL wire limit)
pub const MAX_PLACEHOLDERS: usize = u16::MAX as usize;

/// Maximum rows that fit in one statement.
///
/// `floor(row_count * MAX_PLACEHOLDERS / estimated_total_fields)`, where
/// `estimated_total_fields` is the placeholder estimate for all `row_count`
/// rows together.
///
/// ```
/// use rdbc_bulk::budget::max_batch_rows;
///
/// assert_eq!(max_batch_rows(10, 40).unwrap(), 16383);
/// ```
pub fn max_batch_rows(
    row_count: usize,
    estimated_total_fields: usize,
) -> Result<usize, ValidationError> {
    if estimated_total_fields == 0 {
        return Err(ValidationError::NonPositive {
            name: "estimated total fields",
        });
    }

    let rows = (row_count as u128 * MAX_PLACEHOLDERS as u128) / estimated_total_fields as u128;
    Ok(usize::try_from(rows).unwrap_or(usize::MAX))
}

/// Placeholder estimate for a CASE-based bulk update of `row_count` rows.
///
/// Each non-key value is one placeholder, its CASE arm repeats one equality
/// per key column, and the WHERE clause binds every key once per row.
///
/// ```
/// use rdbc_bulk::budget::estimate_bulk_update_fields;
///
/// assert_eq!(estimate_bulk_update_fields(10, 4, 1).unwrap(), 70);
/// assert_eq!(estimate_bulk_update_fields(2, 4, 1).unwrap(), 14);
/// ```
pub fn estimate_bulk_update_fields(
    row_count: usize,
    fields_per_row: usize,
    key_count: usize,
) -> Result<usize, ValidationError> {
    if key_count > fields_per_row {
        return Err(ValidationError::KeysExceedFields {
            keys: key_count,
            fields: fields_per_row,
        });
    }

    let value_columns = fields_per_row - key_count;
    let value_fields = value_columns
        .checked_mul(row_count)
        .ok_or(ValidationError::BudgetOverflow)?;
    let per_value_key_repeats = key_count
        .checked_mul(value_fields)
        .ok_or(ValidationError::BudgetOverflow)?;
    let where_fields = key_count
        .checked_mul(row_count)
        .ok_or(ValidationError::BudgetOverflow)?;

    value_fields
        .checked_add(per_value_key_repeats)
        .and_then(|sum| sum.checked_add(where_fields))
        .ok_or(ValidationError::BudgetOverflow)
}

/// Placeholder estimate for inserting `row_count` rows of `fields_per_row` columns
pub fn estimate_insert_fields(
    row_count: usize,
    fields_per_row: usize,
) -> Result<usize, ValidationError> {
    fields_per_row
        .checked_mul(row_count)
        .ok_or(ValidationError::BudgetOverflow)
}

/// Placeholder estimate for an OR-of-keys bulk delete
pub fn estimate_bulk_delete_fields(
    row_count: usize,
    key_count: usize,
) -> Result<usize, ValidationError> {
    key_count
        .checked_mul(row_count)
        .ok_or(ValidationError::BudgetOverflow)
}

/// Page size for a batch: [`max_batch_rows`], optionally capped.
///
/// Fails with [`ValidationError::PlaceholderLimit`] when not even a single row
/// fits under the ceiling.
pub fn page_size(
    row_count: usize,
    estimated_total_fields: usize,
    cap: Option<usize>,
) -> Result<usize, ValidationError> {
    if row_count == 0 {
        return Err(ValidationError::EmptyRows);
    }

    let mut size = max_batch_rows(row_count, estimated_total_fields)?;
    if let Some(cap) = cap {
        size = size.min(cap);
    }

    if size == 0 {
        return Err(ValidationError::PlaceholderLimit {
            count: estimated_total_fields.div_ceil(row_count),
            limit: MAX_PLACEHOLDERS,
        });
    }

    Ok(size)
}
