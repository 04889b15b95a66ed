//! Query-based validators.
//!
//! These checks run live SQL through the connection handed to them in the
//! execution context. Generated statements interpolate only validated
//! identifiers; every value travels as a bound parameter. The violation
//! convention is uniform: each generated query selects an `invalid_count`
//! column and the check passes only when it is zero. Custom SQL is the one
//! user-supplied statement and must pass the read-only guardrail first.

use tracing::debug;

use datapulse_core::validation::{validate_column_name, validate_table_name};
use datapulse_core::{
    AssertionAggregation, AssertionOperator, AssertionParameters, AssertionScope, CheckCategory,
    CheckConfig, CheckResult, DatasetRef,
};
use datapulse_connectors::{ConnectionHandle, QueryLimits, QueryOutput, SqlValue};

use crate::guardrail::{ensure_read_only, parse_query_output};
use crate::params::{f64_param, opt_i64_param, required_column, required_param, try_check};
use crate::{CheckContext, ExecutionFamily, Validator, ValidatorRegistry};

/// Register every query-based validator.
pub fn register(registry: &mut ValidatorRegistry) {
    registry.register(Box::new(ColumnValueRange));
    registry.register(Box::new(ColumnValuesInSet { forbidden: false }));
    registry.register(Box::new(ColumnValuesInSet { forbidden: true }));
    registry.register(Box::new(ColumnValuesMatchRegex { negated: false }));
    registry.register(Box::new(ColumnValuesMatchRegex { negated: true }));
    registry.register(Box::new(ColumnLengthBetween));
    registry.register(Box::new(TableCustomSql));
}

/// The validated, interpolation-safe table name for a dataset.
fn table_name(dataset: &DatasetRef) -> Result<String, CheckResult> {
    let qualified = dataset.table_address().qualified_table();
    validate_table_name(&qualified)
        .map_err(|err| CheckResult::error(err.to_string()))?;
    Ok(qualified)
}

fn safe_column(check: &CheckConfig) -> Result<String, CheckResult> {
    let column = required_column(check)?;
    validate_column_name(column).map_err(|err| CheckResult::error(err.to_string()))?;
    Ok(column.to_string())
}

/// Run a generated violation-count query and read its `invalid_count`.
fn count_violations(
    connection: &mut ConnectionHandle,
    sql: &str,
    params: &[SqlValue],
    limits: &QueryLimits,
) -> Result<(i64, QueryOutput), CheckResult> {
    debug!(sql, "executing violation-count query");
    let output = connection
        .query(sql, params, limits)
        .map_err(|err| CheckResult::error(format!("query execution failed: {err}")))?;
    let invalid_count = output
        .first_row_value("invalid_count")
        .and_then(SqlValue::as_i64)
        .unwrap_or(0);
    Ok((invalid_count, output))
}

fn require_connection<'a>(
    connection: &'a mut Option<&mut ConnectionHandle>,
) -> Result<&'a mut ConnectionHandle, CheckResult> {
    connection.as_deref_mut().ok_or_else(|| {
        CheckResult::error("no database connection available for query-based check")
    })
}

/// `column_value_range`: count values outside an inclusive numeric range.
struct ColumnValueRange;

impl Validator for ColumnValueRange {
    fn check_type(&self) -> &'static str {
        "column_value_range"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Query
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetColumn
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::Between
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::Identity
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Column
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let column = try_check!(safe_column(ctx.check));
        let table = try_check!(table_name(ctx.dataset));
        let min = try_check!(f64_param(ctx.check, "min_value", f64::NEG_INFINITY));
        let max = try_check!(f64_param(ctx.check, "max_value", f64::INFINITY));
        let connection = try_check!(require_connection(&mut ctx.connection));

        let sql = format!(
            "SELECT COUNT(*) AS invalid_count, MIN({column}) AS actual_min, \
             MAX({column}) AS actual_max FROM {table} \
             WHERE {column} < ? OR {column} > ?"
        );
        let params = [SqlValue::Real(min), SqlValue::Real(max)];
        let (invalid_count, output) =
            try_check!(count_violations(connection, &sql, &params, &ctx.limits));

        let actual_min = output
            .first_row_value("actual_min")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "NULL".to_string());
        let actual_max = output
            .first_row_value("actual_max")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "NULL".to_string());

        CheckResult::judged(invalid_count == 0)
            .with_actual(format!("{actual_min} to {actual_max}"))
            .with_metric("invalid_count", invalid_count)
            .with_metric("actual_min", actual_min)
            .with_metric("actual_max", actual_max)
            .with_metric("expected_range", format!("[{min}, {max}]"))
    }
}

/// `column_values_in_set` / `column_values_not_in_set`: set membership over
/// non-null values, from a comma-separated `value_set` parameter.
struct ColumnValuesInSet {
    forbidden: bool,
}

impl Validator for ColumnValuesInSet {
    fn check_type(&self) -> &'static str {
        if self.forbidden {
            "column_values_not_in_set"
        } else {
            "column_values_in_set"
        }
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Query
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetColumn
    }
    fn operator(&self) -> AssertionOperator {
        if self.forbidden {
            AssertionOperator::NotIn
        } else {
            AssertionOperator::In
        }
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::Identity
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Column
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let column = try_check!(safe_column(ctx.check));
        let table = try_check!(table_name(ctx.dataset));
        let value_set = try_check!(required_param(ctx.check, "value_set"));
        let values: Vec<SqlValue> = value_set
            .split(',')
            .map(|v| SqlValue::Text(v.trim().to_string()))
            .collect();
        if values.is_empty() {
            return CheckResult::error("value_set parameter must list at least one value");
        }
        let connection = try_check!(require_connection(&mut ctx.connection));

        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = if self.forbidden {
            // Rows holding a forbidden value are violations.
            format!(
                "SELECT COUNT(*) AS invalid_count FROM {table} \
                 WHERE {column} IN ({placeholders})"
            )
        } else {
            // Rows outside the allowed set are violations; nulls are exempt.
            format!(
                "SELECT COUNT(*) AS invalid_count FROM {table} \
                 WHERE {column} NOT IN ({placeholders}) AND {column} IS NOT NULL"
            )
        };
        let (invalid_count, _) =
            try_check!(count_violations(connection, &sql, &values, &ctx.limits));

        let label = if self.forbidden {
            "forbidden_values"
        } else {
            "allowed_values"
        };
        CheckResult::judged(invalid_count == 0)
            .with_metric("invalid_count", invalid_count)
            .with_metric(label, value_set)
    }
}

/// `column_values_match_regex` / `column_values_not_match_regex`.
///
/// The predicate syntax differs per platform; the connection's dialect
/// chooses between `REGEXP`, `~`, and `REGEXP_LIKE`.
struct ColumnValuesMatchRegex {
    negated: bool,
}

impl Validator for ColumnValuesMatchRegex {
    fn check_type(&self) -> &'static str {
        if self.negated {
            "column_values_not_match_regex"
        } else {
            "column_values_match_regex"
        }
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Query
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetColumn
    }
    fn operator(&self) -> AssertionOperator {
        if self.negated {
            AssertionOperator::NotRegexMatch
        } else {
            AssertionOperator::RegexMatch
        }
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::Identity
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Column
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let column = try_check!(safe_column(ctx.check));
        let table = try_check!(table_name(ctx.dataset));
        let regex = try_check!(required_param(ctx.check, "regex")).to_string();
        let connection = try_check!(require_connection(&mut ctx.connection));

        let dialect = connection.dialect();
        let sql = if self.negated {
            // Values matching the forbidden pattern are violations.
            format!(
                "SELECT COUNT(*) AS invalid_count FROM {table} WHERE {}",
                dialect.regex_predicate(&column, false)
            )
        } else {
            // Non-null values failing to match are violations.
            format!(
                "SELECT COUNT(*) AS invalid_count FROM {table} \
                 WHERE {column} IS NOT NULL AND {}",
                dialect.regex_predicate(&column, true)
            )
        };
        let params = [SqlValue::Text(regex.clone())];
        let (invalid_count, _) =
            try_check!(count_violations(connection, &sql, &params, &ctx.limits));

        let label = if self.negated {
            "forbidden_regex_pattern"
        } else {
            "regex_pattern"
        };
        CheckResult::judged(invalid_count == 0)
            .with_metric("invalid_count", invalid_count)
            .with_metric(label, regex)
    }
}

/// `column_length_between`: string lengths within an inclusive range.
struct ColumnLengthBetween;

impl Validator for ColumnLengthBetween {
    fn check_type(&self) -> &'static str {
        "column_length_between"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Query
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetColumn
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::Between
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::Length
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Column
    }

    fn parameters(&self, check: &CheckConfig) -> AssertionParameters {
        AssertionParameters {
            value: None,
            min_value: check.param("min_length").map(String::from),
            max_value: check.param("max_length").map(String::from),
        }
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let column = try_check!(safe_column(ctx.check));
        let table = try_check!(table_name(ctx.dataset));
        let min_length = try_check!(opt_i64_param(ctx.check, "min_length")).unwrap_or(0);
        let max_length = try_check!(opt_i64_param(ctx.check, "max_length"));
        let connection = try_check!(require_connection(&mut ctx.connection));

        let (sql, params) = match max_length {
            Some(max) => (
                format!(
                    "SELECT COUNT(*) AS invalid_count FROM {table} \
                     WHERE {column} IS NOT NULL \
                     AND (LENGTH({column}) < ? OR LENGTH({column}) > ?)"
                ),
                vec![SqlValue::Integer(min_length), SqlValue::Integer(max)],
            ),
            None => (
                format!(
                    "SELECT COUNT(*) AS invalid_count FROM {table} \
                     WHERE {column} IS NOT NULL AND LENGTH({column}) < ?"
                ),
                vec![SqlValue::Integer(min_length)],
            ),
        };
        let (invalid_count, _) =
            try_check!(count_violations(connection, &sql, &params, &ctx.limits));

        CheckResult::judged(invalid_count == 0)
            .with_metric("invalid_count", invalid_count)
            .with_metric("min_length", min_length)
            .with_metric(
                "max_length",
                max_length.map_or_else(|| "unlimited".to_string(), |m| m.to_string()),
            )
    }
}

/// `table_custom_sql`: a guarded, user-supplied statement.
///
/// With an `expected_result` parameter the scalar result must equal it
/// (numerically when both sides parse as numbers). Without one, the generic
/// result-shape convention applies: zero rows pass, a lone scalar is judged
/// by truthiness, returned rows are violations.
struct TableCustomSql;

impl Validator for TableCustomSql {
    fn check_type(&self) -> &'static str {
        "table_custom_sql"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Query
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetRows
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::Native
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::Native
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::CustomSql
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let sql = try_check!(required_param(ctx.check, "sql")).to_string();
        if let Err(err) = ensure_read_only(&sql) {
            return CheckResult::error(err.to_string());
        }
        let expected = ctx.check.param("expected_result").map(String::from);
        let connection = try_check!(require_connection(&mut ctx.connection));

        let output = match connection.query(&sql, &[], &ctx.limits) {
            Ok(output) => output,
            Err(err) => return CheckResult::error(format!("query execution failed: {err}")),
        };

        match expected {
            Some(expected) => {
                let actual = match output.scalar() {
                    Some(value) => value.to_string(),
                    None => {
                        return CheckResult::error(
                            "expected_result requires the statement to return a single scalar",
                        )
                    }
                };
                let success = match (actual.parse::<f64>(), expected.parse::<f64>()) {
                    (Ok(a), Ok(e)) => a == e,
                    _ => actual == expected,
                };
                CheckResult::judged(success)
                    .with_actual(actual.clone())
                    .with_metric("actual_result", actual)
                    .with_metric("expected_result", expected)
                    .with_metric("sql", sql)
            }
            None => {
                let verdict = parse_query_output(&output);
                let mut result = CheckResult::judged(verdict.success)
                    .with_row_count(verdict.row_count)
                    .with_metric("row_count", verdict.row_count)
                    .with_metric("sql", sql);
                if let Some(actual) = verdict.actual_value {
                    result = result.with_actual(actual.clone()).with_metric("actual_result", actual);
                }
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datapulse_core::CheckConfig;
    use datapulse_connectors::SqliteConnection;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// Seed a file-backed SQLite database and return a handle onto it.
    fn seeded_handle(dir: &TempDir) -> ConnectionHandle {
        let path = dir.path().join("users.db");
        let seed = rusqlite::Connection::open(&path).unwrap();
        seed.execute_batch(
            "CREATE TABLE users (id INTEGER, email TEXT, age INTEGER, status TEXT);
             INSERT INTO users VALUES (1, 'a@example.com', 30, 'active');
             INSERT INTO users VALUES (2, 'b@example.com', 25, 'pending');
             INSERT INTO users VALUES (3, 'not-an-email', 35, 'active');
             INSERT INTO users VALUES (4, NULL, 200, 'banned');",
        )
        .unwrap();
        drop(seed);
        let conn = SqliteConnection::open(path.to_str().unwrap()).unwrap();
        ConnectionHandle::new("sqlite", None, Box::new(conn))
    }

    fn check(check_type: &str, column: Option<&str>, params: &[(&str, &str)]) -> CheckConfig {
        CheckConfig {
            name: format!("{check_type}-test"),
            check_type: check_type.to_string(),
            dataset_pattern: "*".to_string(),
            column: column.map(String::from),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn run(config: &CheckConfig, connection: Option<&mut ConnectionHandle>) -> CheckResult {
        let registry = ValidatorRegistry::builtin();
        let validator = registry.get(&config.check_type).expect("registered");
        let dataset: DatasetRef = "urn:li:dataset:(urn:li:dataPlatform:sqlite,users,PROD)"
            .parse()
            .unwrap();
        let mut ctx = CheckContext {
            check: config,
            dataset: &dataset,
            profile: None,
            connection,
            limits: QueryLimits::default(),
        };
        validator.execute(&mut ctx)
    }

    #[test]
    fn missing_connection_is_a_diagnostic() {
        let config = check("column_value_range", Some("age"), &[("min_value", "0")]);
        let result = run(&config, None);
        assert!(!result.success);
        assert!(result
            .error_message()
            .unwrap()
            .contains("no database connection"));
    }

    #[test]
    fn value_range_counts_out_of_range_rows() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        let passing = check(
            "column_value_range",
            Some("age"),
            &[("min_value", "0"), ("max_value", "250")],
        );
        assert!(run(&passing, Some(&mut handle)).success);

        let failing = check(
            "column_value_range",
            Some("age"),
            &[("min_value", "18"), ("max_value", "120")],
        );
        let result = run(&failing, Some(&mut handle));
        assert!(!result.success);
        assert_eq!(
            result.native_results.get("invalid_count").map(String::as_str),
            Some("1")
        );
        assert_eq!(
            result.native_results.get("actual_max").map(String::as_str),
            Some("200")
        );
    }

    #[test]
    fn in_set_ignores_nulls_and_counts_strays() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        let passing = check(
            "column_values_in_set",
            Some("status"),
            &[("value_set", "active, pending, banned")],
        );
        assert!(run(&passing, Some(&mut handle)).success);

        let failing = check(
            "column_values_in_set",
            Some("status"),
            &[("value_set", "active, pending")],
        );
        let result = run(&failing, Some(&mut handle));
        assert!(!result.success);
        assert_eq!(
            result.native_results.get("invalid_count").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn not_in_set_counts_forbidden_values() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        let passing = check(
            "column_values_not_in_set",
            Some("status"),
            &[("value_set", "deleted")],
        );
        assert!(run(&passing, Some(&mut handle)).success);

        let failing = check(
            "column_values_not_in_set",
            Some("status"),
            &[("value_set", "banned")],
        );
        assert!(!run(&failing, Some(&mut handle)).success);
    }

    #[test]
    fn regex_match_skips_nulls() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        let failing = check(
            "column_values_match_regex",
            Some("email"),
            &[("regex", "^[^@]+@[^@]+$")],
        );
        let result = run(&failing, Some(&mut handle));
        assert!(!result.success);
        // Only 'not-an-email' violates; the NULL row is exempt.
        assert_eq!(
            result.native_results.get("invalid_count").map(String::as_str),
            Some("1")
        );

        let passing = check(
            "column_values_match_regex",
            Some("status"),
            &[("regex", "^[a-z]+$")],
        );
        assert!(run(&passing, Some(&mut handle)).success);
    }

    #[test]
    fn not_match_regex_counts_matches() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        let failing = check(
            "column_values_not_match_regex",
            Some("status"),
            &[("regex", "^banned$")],
        );
        assert!(!run(&failing, Some(&mut handle)).success);

        let passing = check(
            "column_values_not_match_regex",
            Some("status"),
            &[("regex", "^deleted$")],
        );
        assert!(run(&passing, Some(&mut handle)).success);
    }

    #[test]
    fn length_bounds() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        let passing = check(
            "column_length_between",
            Some("status"),
            &[("min_length", "1"), ("max_length", "20")],
        );
        assert!(run(&passing, Some(&mut handle)).success);

        let failing = check(
            "column_length_between",
            Some("status"),
            &[("min_length", "7")],
        );
        let result = run(&failing, Some(&mut handle));
        assert!(!result.success);
        assert_eq!(
            result.native_results.get("max_length").map(String::as_str),
            Some("unlimited")
        );
    }

    #[test]
    fn custom_sql_with_expected_result() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        let passing = check(
            "table_custom_sql",
            None,
            &[("sql", "SELECT COUNT(*) FROM users"), ("expected_result", "4")],
        );
        assert!(run(&passing, Some(&mut handle)).success);

        let failing = check(
            "table_custom_sql",
            None,
            &[("sql", "SELECT COUNT(*) FROM users"), ("expected_result", "5")],
        );
        let result = run(&failing, Some(&mut handle));
        assert!(!result.success);
        assert_eq!(result.actual_value.as_deref(), Some("4"));
    }

    #[test]
    fn custom_sql_without_expectation_uses_shape_convention() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        // Zero violating rows: pass.
        let empty = check(
            "table_custom_sql",
            None,
            &[("sql", "SELECT id FROM users WHERE age > 1000")],
        );
        let result = run(&empty, Some(&mut handle));
        assert!(result.success);
        assert_eq!(result.row_count, Some(0));

        // A lone zero scalar is a failing boolean probe.
        let zero_scalar = check(
            "table_custom_sql",
            None,
            &[("sql", "SELECT COUNT(*) FROM users WHERE age > 1000")],
        );
        assert!(!run(&zero_scalar, Some(&mut handle)).success);

        // Returned rows are violations.
        let rows = check(
            "table_custom_sql",
            None,
            &[("sql", "SELECT id, age FROM users WHERE age > 100")],
        );
        assert!(!run(&rows, Some(&mut handle)).success);
    }

    #[test]
    fn custom_sql_is_guarded() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        let config = check(
            "table_custom_sql",
            None,
            &[("sql", "DELETE FROM users"), ("expected_result", "0")],
        );
        let result = run(&config, Some(&mut handle));
        assert!(!result.success);
        assert!(result.error_message().unwrap().contains("SELECT or WITH"));
    }

    #[test]
    fn hostile_column_name_is_rejected_before_sql() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        let config = check(
            "column_value_range",
            Some("age; DROP TABLE users"),
            &[("min_value", "0")],
        );
        let result = run(&config, Some(&mut handle));
        assert!(!result.success);
        assert!(result.error_message().unwrap().contains("invalid characters"));
    }

    #[test]
    fn query_fault_becomes_diagnostic_result() {
        let dir = TempDir::new().unwrap();
        let mut handle = seeded_handle(&dir);

        // Column does not exist in the seeded table.
        let config = check("column_value_range", Some("salary"), &[("min_value", "0")]);
        let result = run(&config, Some(&mut handle));
        assert!(!result.success);
        assert!(result.error_message().unwrap().contains("query execution failed"));
    }
}
