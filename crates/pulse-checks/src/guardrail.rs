//! SQL guardrail and query-result normalization.
//!
//! The guardrail is a conservative **textual** gate, not a parser: it
//! inspects the statement prefix and scans for forbidden keywords as
//! standalone words. It does not understand comments or string literals, so
//! a keyword smuggled inside either is still rejected (false positives are
//! acceptable, false negatives via clever quoting are out of scope for a
//! textual gate and documented as such).
//!
//! Result normalization turns heterogeneous query outputs into one
//! pass/fail convention:
//!
//! - zero rows mean "no violations found" and pass;
//! - a lone numeric/boolean scalar is judged by truthiness, so `0` fails:
//!   single-scalar probes are boolean probes by convention (violation-count
//!   checks never rely on this, since they select an explicit
//!   `invalid_count` column and compare it to zero themselves);
//! - any other shape treats returned rows as violations and passes only
//!   when none came back;
//! - unrecognized scalars are informational and pass with the raw value
//!   stringified.

use datapulse_connectors::{QueryOutput, SqlValue};
use datapulse_core::{QualityError, Result};

/// Keywords that reject a statement outright, wherever they appear.
const FORBIDDEN_KEYWORDS: [&str; 10] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "MERGE", "GRANT",
    "REVOKE",
];

/// Whether `sql` passes the read-only gate.
pub fn is_read_only(sql: &str) -> bool {
    ensure_read_only(sql).is_ok()
}

/// Validate that `sql` is read-only, with the reason on rejection.
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let upper = sql.trim().to_uppercase();

    if !(upper.starts_with("SELECT") || upper.starts_with("WITH")) {
        return Err(QualityError::UnsafeSql(
            "statement must start with SELECT or WITH".to_string(),
        ));
    }

    for word in upper
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
    {
        if FORBIDDEN_KEYWORDS.contains(&word) {
            return Err(QualityError::UnsafeSql(format!(
                "statement contains forbidden keyword {word}"
            )));
        }
    }

    Ok(())
}

/// Normalized verdict for a raw query result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVerdict {
    pub success: bool,
    pub row_count: i64,
    /// The scalar value, for single-scalar results.
    pub actual_value: Option<String>,
}

/// Normalize a query output into a pass/fail verdict.
pub fn parse_query_output(output: &QueryOutput) -> QueryVerdict {
    if output.rows.is_empty() {
        // Absence of violations is success by convention.
        return QueryVerdict {
            success: true,
            row_count: 0,
            actual_value: None,
        };
    }

    if let Some(scalar) = output.scalar() {
        let success = match scalar {
            SqlValue::Integer(v) => *v != 0,
            SqlValue::Real(v) => *v != 0.0,
            // Non-numeric scalars are informational.
            _ => true,
        };
        return QueryVerdict {
            success,
            row_count: 1,
            actual_value: Some(scalar.to_string()),
        };
    }

    // Multiple rows, or one row with several columns: rows are violations.
    QueryVerdict {
        success: false,
        row_count: output.row_count(),
        actual_value: None,
    }
}
