//! Named-to-positional parameter binding
//!
//! Compiled queries carry `:name` placeholders. Drivers want positional
//! parameters, so [`bind_named`] rewrites every occurrence into the dialect's
//! form and collects the values in the same order. An [`Value::Array`] bind
//! expands to one placeholder per element, which is how `IN (:cond_id)`
//! becomes `IN ($1, $2, $3)`.
//!
//! The scanner leaves PostgreSQL `::type` casts and anything inside
//! single-quoted literals alone.

use crate::dialect::ParamStyle;
use crate::error::{Error, Result};
use crate::types::{BindSet, Value};

/// Piece of SQL text produced by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

#[inline]
fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

#[inline]
fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn scan(sql: &str) -> Vec<Segment<'_>> {
    let bytes = sql.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut in_literal = false;

    while i < bytes.len() {
        match bytes[i] {
            // '' inside a literal toggles twice, so escaped quotes need no special case
            b'\'' => {
                in_literal = !in_literal;
                i += 1;
            }
            b':' if !in_literal => {
                if bytes.get(i + 1) == Some(&b':') {
                    i += 2;
                    continue;
                }
                let name_start = i + 1;
                if !bytes.get(name_start).copied().is_some_and(is_name_start) {
                    i += 1;
                    continue;
                }

                let mut end = name_start + 1;
                while end < bytes.len() && is_name_char(bytes[end]) {
                    end += 1;
                }

                if start < i {
                    segments.push(Segment::Text(&sql[start..i]));
                }
                segments.push(Segment::Placeholder(&sql[name_start..end]));
                i = end;
                start = end;
            }
            _ => i += 1,
        }
    }

    if start < bytes.len() {
        segments.push(Segment::Text(&sql[start..]));
    }
    segments
}

/// Placeholder names in order of appearance, repeats included
pub fn placeholder_names(sql: &str) -> Vec<&str> {
    scan(sql)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Positional parameters `sql` needs once bound against `binds`.
///
/// Unknown names count as one placeholder each.
pub fn count_placeholders(sql: &str, binds: &BindSet) -> usize {
    placeholder_names(sql)
        .into_iter()
        .map(|name| binds.get(name).map_or(1, Value::placeholder_width))
        .sum()
}

/// Rewrite `:name` placeholders into positional form.
///
/// Every occurrence gets its own positional index, so a name used twice is
/// bound twice. Binds that the SQL never references are ignored.
///
/// ```
/// use rdbc_bulk::bind::bind_named;
/// use rdbc_bulk::dialect::ParamStyle;
/// use rdbc_bulk::types::{BindSet, Value};
///
/// let mut binds = BindSet::new();
/// binds.insert("cond_id".into(), Value::array([1, 2]));
/// binds.insert("val_name".into(), Value::from("Bob"));
///
/// let (sql, params) = bind_named(
///     "UPDATE t SET name = :val_name WHERE id IN (:cond_id)",
///     &binds,
///     ParamStyle::Dollar,
/// )
/// .unwrap();
/// assert_eq!(sql, "UPDATE t SET name = $1 WHERE id IN ($2, $3)");
/// assert_eq!(params.len(), 3);
/// ```
pub fn bind_named(sql: &str, binds: &BindSet, style: ParamStyle) -> Result<(String, Vec<Value>)> {
    let mut out = String::with_capacity(sql.len());
    let mut params = Vec::new();

    for segment in scan(sql) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Placeholder(name) => {
                let value = binds
                    .get(name)
                    .ok_or_else(|| Error::binding(format!("no value bound for ':{}'", name)))?;

                match value.as_array() {
                    Some(items) => {
                        if items.is_empty() {
                            return Err(Error::binding(format!(
                                "empty sequence bound for ':{}'",
                                name
                            )));
                        }
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                out.push_str(", ");
                            }
                            params.push(item.clone());
                            out.push_str(&style.placeholder(params.len()));
                        }
                    }
                    None => {
                        params.push(value.clone());
                        out.push_str(&style.placeholder(params.len()));
                    }
                }
            }
        }
    }

    Ok((out, params))
}
