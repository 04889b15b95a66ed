//! Identifier validation for SQL interpolation.
//!
//! Query-based checks interpolate column and table identifiers into SQL text
//! (values are always bound as parameters, never interpolated). These checks
//! reject anything that is not a plain identifier before it gets near a
//! statement.

use crate::error::{QualityError, Result};

/// Maximum length accepted for a single identifier segment.
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Validate a column name: non-empty, bounded, alphanumeric plus `_` and `$`.
pub fn validate_column_name(name: &str) -> Result<()> {
    validate_segment(name, "column name")
}

/// Validate a qualified table name, segment by segment.
///
/// Accepts `table`, `schema.table`, and `database.schema.table` forms.
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(QualityError::Validation(
            "table name cannot be empty".to_string(),
        ));
    }
    for segment in name.split('.') {
        validate_segment(segment, "table name segment")?;
    }
    Ok(())
}

fn validate_segment(segment: &str, what: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(QualityError::Validation(format!("{what} cannot be empty")));
    }
    if segment.len() > MAX_IDENTIFIER_LEN {
        return Err(QualityError::Validation(format!(
            "{what} too long: {} > {} characters",
            segment.len(),
            MAX_IDENTIFIER_LEN
        )));
    }
    if !segment
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
    {
        return Err(QualityError::Validation(format!(
            "{what} '{segment}' contains invalid characters (allowed: alphanumeric, _, $)"
        )));
    }
    Ok(())
}
