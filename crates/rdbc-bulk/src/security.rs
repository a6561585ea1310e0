//! Identifier validation for SQL injection prevention in rdbc-bulk.
//!
//! Table, column and key names are interpolated into generated SQL verbatim,
//! so every name passes through here before the compiler emits it.

use crate::error::ValidationError;

/// Maximum identifier length accepted
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Validate a SQL identifier (column or key name).
///
/// Enforces strict character rules:
/// - Must not be empty
/// - Maximum 255 characters
/// - Must start with ASCII letter or underscore
/// - May only contain ASCII alphanumeric characters and underscores
///
/// # Examples
///
/// ```
/// use rdbc_bulk::security::validate_sql_identifier;
///
/// assert!(validate_sql_identifier("users").is_ok());
/// assert!(validate_sql_identifier("my_table_123").is_ok());
/// assert!(validate_sql_identifier("_private").is_ok());
///
/// assert!(validate_sql_identifier("x; DROP TABLE users--").is_err());
/// assert!(validate_sql_identifier("").is_err());
/// assert!(validate_sql_identifier("123abc").is_err());
/// ```
pub fn validate_sql_identifier(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::invalid_identifier(
            name,
            "identifier cannot be empty",
        ));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::invalid_identifier(
            name,
            format!(
                "too long: {} chars (max {})",
                name.len(),
                MAX_IDENTIFIER_LEN
            ),
        ));
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => {
            return Err(ValidationError::invalid_identifier(
                name,
                "must start with a letter or underscore",
            ));
        }
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return Err(ValidationError::invalid_identifier(
                name,
                format!("contains invalid character '{}'", c),
            ));
        }
    }

    Ok(())
}

/// Validate a table reference, either `table` or `schema.table`.
///
/// An empty name is reported as [`ValidationError::EmptyTable`].
///
/// ```
/// use rdbc_bulk::security::validate_table_name;
///
/// assert!(validate_table_name("user").is_ok());
/// assert!(validate_table_name("public.user").is_ok());
/// assert!(validate_table_name("a.b.c").is_err());
/// assert!(validate_table_name("").is_err());
/// ```
pub fn validate_table_name(table: &str) -> Result<(), ValidationError> {
    if table.is_empty() {
        return Err(ValidationError::EmptyTable);
    }

    match table.split_once('.') {
        Some((schema, name)) => {
            if name.contains('.') {
                return Err(ValidationError::invalid_identifier(
                    table,
                    "at most one schema qualifier is allowed",
                ));
            }
            validate_sql_identifier(schema)?;
            validate_sql_identifier(name)
        }
        None => validate_sql_identifier(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_sql_identifier("users").is_ok());
        assert!(validate_sql_identifier("my_table").is_ok());
        assert!(validate_sql_identifier("_private").is_ok());
        assert!(validate_sql_identifier("a").is_ok());
        assert!(validate_sql_identifier("TABLE_123").is_ok());
    }

    #[test]
    fn test_too_long_identifier() {
        let long = "a".repeat(256);
        assert!(validate_sql_identifier(&long).is_err());

        let max = "a".repeat(255);
        assert!(validate_sql_identifier(&max).is_ok());
    }

    #[test]
    fn test_injection_attempts() {
        assert!(validate_sql_identifier("x; DROP TABLE users--").is_err());
        assert!(validate_sql_identifier("x' OR '1'='1").is_err());
        assert!(validate_sql_identifier("x--").is_err());
        assert!(validate_sql_identifier("x()").is_err());
        // Cyrillic е
        assert!(validate_sql_identifier("tabl\u{0435}").is_err());
        assert!(validate_sql_identifier("user name").is_err());
        assert!(validate_sql_identifier("x\nDROP TABLE").is_err());
        assert!(validate_sql_identifier("schema.table").is_err());
    }

    #[test]
    fn test_special_chars_rejected() {
        for ch in &['.', '-', '@', '#', '$', '!', '%', '&', '*', '[', ']', '"', '`', ':'] {
            let name = format!("a{}", ch);
            assert!(
                validate_sql_identifier(&name).is_err(),
                "Should reject '{}'",
                name
            );
        }
    }

    #[test]
    fn test_table_names() {
        assert_eq!(validate_table_name(""), Err(ValidationError::EmptyTable));
        assert!(validate_table_name("public.users").is_ok());
        assert!(validate_table_name(".users").is_err());
        assert!(validate_table_name("public.").is_err());
        assert!(validate_table_name("users; DELETE FROM x").is_err());
    }
}
