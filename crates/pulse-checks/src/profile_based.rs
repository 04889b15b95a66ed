//! Profile-based validators.
//!
//! These checks read the cached dataset profile and perform no I/O. A
//! missing profile, column, or statistic is a diagnostic failure, never a
//! fault. Absent numeric bounds are unconstrained (±infinity), and all
//! bound comparisons are inclusive.

use chrono::Utc;

use datapulse_core::{
    AssertionAggregation, AssertionOperator, AssertionParameters, AssertionScope, CheckCategory,
    CheckConfig, CheckResult, FieldProfile, Profile,
};

use crate::params::{f64_param, i64_param, opt_i64_param, required_column, try_check};
use crate::{CheckContext, ExecutionFamily, Validator, ValidatorRegistry};

/// Register every profile-based validator.
pub fn register(registry: &mut ValidatorRegistry) {
    registry.register(Box::new(RowCountBetween));
    registry.register(Box::new(RowCountEquals));
    registry.register(Box::new(ColumnCountEquals));
    registry.register(Box::new(ColumnCountBetween));
    registry.register(Box::new(ColumnValuesNotNull));
    registry.register(Box::new(ColumnValuesUnique));
    registry.register(Box::new(ColumnNullCountEquals));
    registry.register(Box::new(ColumnDistinctCountBetween));
    registry.register(Box::new(ColumnUniqueProportionBetween));
    registry.register(Box::new(ProfileAge));

    registry.register(Box::new(ColumnStatBetween {
        check_type: "column_min_between",
        aggregation: AssertionAggregation::Min,
        label: "min",
        stat: |field| field.min.as_deref().and_then(|v| v.parse().ok()),
    }));
    registry.register(Box::new(ColumnStatBetween {
        check_type: "column_max_between",
        aggregation: AssertionAggregation::Max,
        label: "max",
        stat: |field| field.max.as_deref().and_then(|v| v.parse().ok()),
    }));
    registry.register(Box::new(ColumnStatBetween {
        check_type: "column_mean_between",
        aggregation: AssertionAggregation::Mean,
        label: "mean",
        stat: |field| field.mean,
    }));
    registry.register(Box::new(ColumnStatBetween {
        check_type: "column_median_between",
        aggregation: AssertionAggregation::Median,
        label: "median",
        stat: |field| field.median,
    }));
    registry.register(Box::new(ColumnStatBetween {
        check_type: "column_stddev_between",
        aggregation: AssertionAggregation::Stddev,
        label: "stddev",
        stat: |field| field.stddev,
    }));
}

fn require_profile<'a>(ctx: &CheckContext<'a>) -> Result<&'a Profile, CheckResult> {
    ctx.profile
        .ok_or_else(|| CheckResult::error("profile data not available for dataset"))
}

fn require_field<'a>(profile: &'a Profile, column: &str) -> Result<&'a FieldProfile, CheckResult> {
    profile
        .field(column)
        .ok_or_else(|| CheckResult::error(format!("column '{column}' not found in profile")))
}

fn require_row_count(profile: &Profile) -> Result<i64, CheckResult> {
    profile
        .row_count
        .ok_or_else(|| CheckResult::error("profile row count is missing"))
}

/// `table_row_count`: row count within an inclusive range.
struct RowCountBetween;

impl Validator for RowCountBetween {
    fn check_type(&self) -> &'static str {
        "table_row_count"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetRows
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::Between
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::RowCount
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Volume
    }

    fn parameters(&self, check: &CheckConfig) -> AssertionParameters {
        AssertionParameters {
            value: None,
            min_value: check.param("min_rows").map(String::from),
            max_value: check.param("max_rows").map(String::from),
        }
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let profile = try_check!(require_profile(ctx));
        let actual = try_check!(require_row_count(profile));
        let min_rows = try_check!(i64_param(ctx.check, "min_rows", 0));
        let max_rows = try_check!(opt_i64_param(ctx.check, "max_rows"));

        let mut success = actual >= min_rows;
        if let Some(max) = max_rows {
            success = success && actual <= max;
        }

        CheckResult::judged(success)
            .with_actual(actual)
            .with_row_count(actual)
            .with_metric("actual_row_count", actual)
            .with_metric("min_rows", min_rows)
            .with_metric(
                "max_rows",
                max_rows.map_or_else(|| "unlimited".to_string(), |m| m.to_string()),
            )
    }
}

/// `table_row_count_equals`: exact row count.
struct RowCountEquals;

impl Validator for RowCountEquals {
    fn check_type(&self) -> &'static str {
        "table_row_count_equals"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetRows
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::EqualTo
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::RowCount
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Volume
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let profile = try_check!(require_profile(ctx));
        let actual = try_check!(require_row_count(profile));
        let expected = try_check!(i64_param(ctx.check, "value", 0));

        CheckResult::judged(actual == expected)
            .with_actual(actual)
            .with_row_count(actual)
            .with_metric("actual_row_count", actual)
            .with_metric("expected_count", expected)
    }
}

/// `table_column_count_equals`: exact column count.
struct ColumnCountEquals;

impl Validator for ColumnCountEquals {
    fn check_type(&self) -> &'static str {
        "table_column_count_equals"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetSchema
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::EqualTo
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::ColumnCount
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Schema
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let profile = try_check!(require_profile(ctx));
        let actual = match profile.column_count {
            Some(count) => count,
            None => return CheckResult::error("profile column count is missing"),
        };
        let expected = try_check!(i64_param(ctx.check, "value", 0));

        CheckResult::judged(actual == expected)
            .with_actual(actual)
            .with_metric("actual_column_count", actual)
            .with_metric("expected_count", expected)
    }
}

/// `table_column_count_between`: column count within an inclusive range.
struct ColumnCountBetween;

impl Validator for ColumnCountBetween {
    fn check_type(&self) -> &'static str {
        "table_column_count_between"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetSchema
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::Between
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::ColumnCount
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Schema
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let profile = try_check!(require_profile(ctx));
        let actual = match profile.column_count {
            Some(count) => count,
            None => return CheckResult::error("profile column count is missing"),
        };
        let min = try_check!(i64_param(ctx.check, "min_value", 0));
        let max = try_check!(opt_i64_param(ctx.check, "max_value"));

        let mut success = actual >= min;
        if let Some(max) = max {
            success = success && actual <= max;
        }

        CheckResult::judged(success)
            .with_actual(actual)
            .with_metric("actual_column_count", actual)
            .with_metric("min_value", min)
            .with_metric(
                "max_value",
                max.map_or_else(|| "unlimited".to_string(), |m| m.to_string()),
            )
    }
}

/// `column_values_not_null`: the column's profiled null count is zero.
struct ColumnValuesNotNull;

impl Validator for ColumnValuesNotNull {
    fn check_type(&self) -> &'static str {
        "column_values_not_null"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetColumn
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::EqualTo
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::NullCount
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Completeness
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let column = try_check!(required_column(ctx.check));
        let profile = try_check!(require_profile(ctx));
        let field = try_check!(require_field(profile, column));
        let null_count = match field.null_count {
            Some(count) => count,
            None => {
                return CheckResult::error(format!(
                    "null count not available for column '{column}'"
                ))
            }
        };

        CheckResult::judged(null_count == 0)
            .with_actual(null_count)
            .with_metric("null_count", null_count)
    }
}

/// `column_values_unique`: every non-null value is distinct.
struct ColumnValuesUnique;

impl Validator for ColumnValuesUnique {
    fn check_type(&self) -> &'static str {
        "column_values_unique"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetColumn
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::EqualTo
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::UniqueCount
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Uniqueness
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let column = try_check!(required_column(ctx.check));
        let profile = try_check!(require_profile(ctx));
        let field = try_check!(require_field(profile, column));
        let (unique_count, null_count) = match (field.unique_count, field.null_count) {
            (Some(unique), Some(null)) => (unique, null),
            _ => {
                return CheckResult::error(format!(
                    "unique/null counts not available for column '{column}'"
                ))
            }
        };

        let non_null_count = profile.row_count.unwrap_or(0) - null_count;
        CheckResult::judged(unique_count == non_null_count)
            .with_actual(unique_count)
            .with_metric("unique_count", unique_count)
            .with_metric("non_null_count", non_null_count)
    }
}

/// `column_null_count_equals`: exact null count.
struct ColumnNullCountEquals;

impl Validator for ColumnNullCountEquals {
    fn check_type(&self) -> &'static str {
        "column_null_count_equals"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetColumn
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::EqualTo
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::NullCount
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Completeness
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let column = try_check!(required_column(ctx.check));
        let profile = try_check!(require_profile(ctx));
        let field = try_check!(require_field(profile, column));
        let actual = match field.null_count {
            Some(count) => count,
            None => {
                return CheckResult::error(format!(
                    "null count not available for column '{column}'"
                ))
            }
        };
        let expected = try_check!(i64_param(ctx.check, "value", 0));

        CheckResult::judged(actual == expected)
            .with_actual(actual)
            .with_metric("actual_null_count", actual)
            .with_metric("expected_count", expected)
    }
}

/// `column_distinct_count_between`: distinct count within an inclusive range.
struct ColumnDistinctCountBetween;

impl Validator for ColumnDistinctCountBetween {
    fn check_type(&self) -> &'static str {
        "column_distinct_count_between"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetColumn
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::Between
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::UniqueCount
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Uniqueness
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let column = try_check!(required_column(ctx.check));
        let profile = try_check!(require_profile(ctx));
        let field = try_check!(require_field(profile, column));
        let actual = match field.unique_count {
            Some(count) => count,
            None => {
                return CheckResult::error(format!(
                    "unique count not available for column '{column}'"
                ))
            }
        };
        let min = try_check!(i64_param(ctx.check, "min_value", 0));
        let max = try_check!(opt_i64_param(ctx.check, "max_value"));

        let mut success = actual >= min;
        if let Some(max) = max {
            success = success && actual <= max;
        }

        CheckResult::judged(success)
            .with_actual(actual)
            .with_metric("actual_unique_count", actual)
            .with_metric("min_value", min)
            .with_metric(
                "max_value",
                max.map_or_else(|| "unlimited".to_string(), |m| m.to_string()),
            )
    }
}

/// `column_unique_proportion_between`: unique count over row count.
///
/// An empty table has proportion 0.0 by definition; never divides by zero.
struct ColumnUniqueProportionBetween;

impl Validator for ColumnUniqueProportionBetween {
    fn check_type(&self) -> &'static str {
        "column_unique_proportion_between"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetColumn
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::Between
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::UniqueProportion
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Uniqueness
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let column = try_check!(required_column(ctx.check));
        let profile = try_check!(require_profile(ctx));
        let row_count = try_check!(require_row_count(profile));
        let field = try_check!(require_field(profile, column));
        let unique_count = match field.unique_count {
            Some(count) => count,
            None => {
                return CheckResult::error(format!(
                    "unique count not available for column '{column}'"
                ))
            }
        };

        let proportion = if row_count > 0 {
            unique_count as f64 / row_count as f64
        } else {
            0.0
        };
        let min = try_check!(f64_param(ctx.check, "min_value", 0.0));
        let max = try_check!(f64_param(ctx.check, "max_value", 1.0));

        CheckResult::judged(min <= proportion && proportion <= max)
            .with_actual(proportion)
            .with_metric("actual_unique_proportion", proportion)
            .with_metric("unique_count", unique_count)
            .with_metric("row_count", row_count)
            .with_metric("min_value", min)
            .with_metric("max_value", max)
    }
}

/// Shared template for the numeric column-statistic range checks.
struct ColumnStatBetween {
    check_type: &'static str,
    aggregation: AssertionAggregation,
    label: &'static str,
    stat: fn(&FieldProfile) -> Option<f64>,
}

impl Validator for ColumnStatBetween {
    fn check_type(&self) -> &'static str {
        self.check_type
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetColumn
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::Between
    }
    fn aggregation(&self) -> AssertionAggregation {
        self.aggregation
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Column
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let column = try_check!(required_column(ctx.check));
        let profile = try_check!(require_profile(ctx));
        let field = try_check!(require_field(profile, column));
        let actual = match (self.stat)(field) {
            Some(value) => value,
            None => {
                return CheckResult::error(format!(
                    "{} not available for column '{column}'",
                    self.label
                ))
            }
        };
        let min = try_check!(f64_param(ctx.check, "min_value", f64::NEG_INFINITY));
        let max = try_check!(f64_param(ctx.check, "max_value", f64::INFINITY));

        CheckResult::judged(min <= actual && actual <= max)
            .with_actual(actual)
            .with_metric(format!("actual_{}", self.label), actual)
            .with_metric("expected_min", min)
            .with_metric("expected_max", max)
    }
}

/// `table_profile_age`: the profile snapshot is recent enough.
struct ProfileAge;

impl Validator for ProfileAge {
    fn check_type(&self) -> &'static str {
        "table_profile_age"
    }
    fn family(&self) -> ExecutionFamily {
        ExecutionFamily::Profile
    }
    fn scope(&self) -> AssertionScope {
        AssertionScope::DatasetRows
    }
    fn operator(&self) -> AssertionOperator {
        AssertionOperator::LessThanOrEqualTo
    }
    fn aggregation(&self) -> AssertionAggregation {
        AssertionAggregation::Native
    }
    fn category(&self) -> CheckCategory {
        CheckCategory::Freshness
    }

    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult {
        let profile = try_check!(require_profile(ctx));
        let profiled_at = match profile.timestamp {
            Some(at) => at,
            None => return CheckResult::error("profile timestamp is missing"),
        };
        if ctx.check.param("max_age_seconds").is_none() {
            return CheckResult::error("max_age_seconds parameter is required");
        }
        let max_age = try_check!(i64_param(ctx.check, "max_age_seconds", 0));

        let age_seconds = (Utc::now() - profiled_at).num_seconds();
        CheckResult::judged(age_seconds <= max_age)
            .with_actual(age_seconds)
            .with_metric("profile_age_seconds", age_seconds)
            .with_metric("max_age_seconds", max_age)
            .with_metric("profiled_at", profiled_at.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use datapulse_core::{CheckConfig, DatasetRef, Profile};
    use datapulse_connectors::QueryLimits;
    use std::collections::BTreeMap;

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

    fn run(config: &CheckConfig, profile: Option<&Profile>) -> CheckResult {
        let registry = ValidatorRegistry::builtin();
        let validator = registry.get(&config.check_type).expect("registered");
        let dataset: DatasetRef = "urn:li:dataset:(urn:li:dataPlatform:mysql,shop.orders,PROD)"
            .parse()
            .unwrap();
        let mut ctx = CheckContext {
            check: config,
            dataset: &dataset,
            profile,
            connection: None,
            limits: QueryLimits::default(),
        };
        validator.execute(&mut ctx)
    }

    fn profile_with_rows(row_count: i64) -> Profile {
        Profile {
            row_count: Some(row_count),
            ..Default::default()
        }
    }

    #[test]
    fn row_count_bounds_are_inclusive() {
        let config = check("table_row_count", None, &[("min_rows", "500"), ("max_rows", "2000")]);
        assert!(run(&config, Some(&profile_with_rows(1000))).success);
        assert!(!run(&config, Some(&profile_with_rows(2001))).success);
        assert!(run(&config, Some(&profile_with_rows(500))).success);
        assert!(run(&config, Some(&profile_with_rows(2000))).success);
        assert!(!run(&config, Some(&profile_with_rows(499))).success);
    }

    #[test]
    fn row_count_without_max_is_unbounded_above() {
        let config = check("table_row_count", None, &[("min_rows", "10")]);
        let result = run(&config, Some(&profile_with_rows(1_000_000)));
        assert!(result.success);
        assert_eq!(
            result.native_results.get("max_rows").map(String::as_str),
            Some("unlimited")
        );
    }

    #[test]
    fn missing_profile_is_a_diagnostic_failure() {
        let config = check("table_row_count", None, &[]);
        let result = run(&config, None);
        assert!(!result.success);
        assert!(result.error_message().unwrap().contains("profile"));
    }

    #[test]
    fn row_count_equals() {
        let config = check("table_row_count_equals", None, &[("value", "42")]);
        assert!(run(&config, Some(&profile_with_rows(42))).success);
        assert!(!run(&config, Some(&profile_with_rows(41))).success);
    }

    #[test]
    fn column_count_checks() {
        let profile = Profile {
            column_count: Some(8),
            ..Default::default()
        };
        assert!(run(&check("table_column_count_equals", None, &[("value", "8")]), Some(&profile)).success);
        assert!(!run(&check("table_column_count_equals", None, &[("value", "9")]), Some(&profile)).success);
        assert!(run(
            &check("table_column_count_between", None, &[("min_value", "5"), ("max_value", "10")]),
            Some(&profile)
        )
        .success);
        assert!(!run(
            &check("table_column_count_between", None, &[("min_value", "9")]),
            Some(&profile)
        )
        .success);
    }

    #[test]
    fn not_null_check() {
        let profile = Profile {
            row_count: Some(10),
            fields: vec![
                FieldProfile {
                    null_count: Some(0),
                    ..FieldProfile::named("clean")
                },
                FieldProfile {
                    null_count: Some(3),
                    ..FieldProfile::named("holey")
                },
            ],
            ..Default::default()
        };
        assert!(run(&check("column_values_not_null", Some("clean"), &[]), Some(&profile)).success);
        let failed = run(&check("column_values_not_null", Some("holey"), &[]), Some(&profile));
        assert!(!failed.success);
        assert_eq!(failed.actual_value.as_deref(), Some("3"));

        let missing = run(&check("column_values_not_null", Some("absent"), &[]), Some(&profile));
        assert!(!missing.success);
        assert!(missing.error_message().unwrap().contains("absent"));
    }

    #[test]
    fn missing_column_parameter_is_a_diagnostic() {
        let profile = profile_with_rows(5);
        let result = run(&check("column_values_not_null", None, &[]), Some(&profile));
        assert!(!result.success);
        assert!(result.error_message().unwrap().contains("column parameter"));
    }

    #[test]
    fn unique_check_accounts_for_nulls() {
        let profile = Profile {
            row_count: Some(10),
            fields: vec![FieldProfile {
                unique_count: Some(7),
                null_count: Some(3),
                ..FieldProfile::named("id")
            }],
            ..Default::default()
        };
        // 7 unique among 7 non-null rows: unique.
        assert!(run(&check("column_values_unique", Some("id"), &[]), Some(&profile)).success);

        let dup_profile = Profile {
            row_count: Some(10),
            fields: vec![FieldProfile {
                unique_count: Some(6),
                null_count: Some(3),
                ..FieldProfile::named("id")
            }],
            ..Default::default()
        };
        assert!(!run(&check("column_values_unique", Some("id"), &[]), Some(&dup_profile)).success);
    }

    #[test]
    fn stat_between_checks() {
        let profile = Profile {
            row_count: Some(100),
            fields: vec![FieldProfile {
                min: Some("5".into()),
                max: Some("95".into()),
                mean: Some(48.5),
                median: Some(50.0),
                stddev: Some(12.0),
                ..FieldProfile::named("age")
            }],
            ..Default::default()
        };
        assert!(run(
            &check("column_min_between", Some("age"), &[("min_value", "0"), ("max_value", "10")]),
            Some(&profile)
        )
        .success);
        assert!(!run(
            &check("column_max_between", Some("age"), &[("max_value", "90")]),
            Some(&profile)
        )
        .success);
        assert!(run(
            &check("column_mean_between", Some("age"), &[("min_value", "40"), ("max_value", "60")]),
            Some(&profile)
        )
        .success);
        assert!(run(
            &check("column_median_between", Some("age"), &[("min_value", "50"), ("max_value", "50")]),
            Some(&profile)
        )
        .success);
        assert!(!run(
            &check("column_stddev_between", Some("age"), &[("max_value", "10")]),
            Some(&profile)
        )
        .success);
    }

    #[test]
    fn absent_bounds_are_unconstrained() {
        let profile = Profile {
            fields: vec![FieldProfile {
                mean: Some(-1e12),
                ..FieldProfile::named("v")
            }],
            ..Default::default()
        };
        assert!(run(&check("column_mean_between", Some("v"), &[]), Some(&profile)).success);
    }

    #[test]
    fn non_numeric_profile_min_is_a_diagnostic() {
        let profile = Profile {
            fields: vec![FieldProfile {
                min: Some("2024-01-01".into()),
                ..FieldProfile::named("created")
            }],
            ..Default::default()
        };
        let result = run(
            &check("column_min_between", Some("created"), &[("min_value", "0")]),
            Some(&profile),
        );
        assert!(!result.success);
        assert!(result.error_message().unwrap().contains("min not available"));
    }

    #[test]
    fn distinct_count_between() {
        let profile = Profile {
            fields: vec![FieldProfile {
                unique_count: Some(12),
                ..FieldProfile::named("country")
            }],
            ..Default::default()
        };
        assert!(run(
            &check("column_distinct_count_between", Some("country"), &[("min_value", "10"), ("max_value", "20")]),
            Some(&profile)
        )
        .success);
        assert!(!run(
            &check("column_distinct_count_between", Some("country"), &[("min_value", "13")]),
            Some(&profile)
        )
        .success);
    }

    #[test]
    fn unique_proportion_guards_zero_rows() {
        let profile = Profile {
            row_count: Some(0),
            fields: vec![FieldProfile {
                unique_count: Some(0),
                ..FieldProfile::named("id")
            }],
            ..Default::default()
        };
        let result = run(
            &check("column_unique_proportion_between", Some("id"), &[]),
            Some(&profile),
        );
        assert!(result.success);
        assert_eq!(result.actual_value.as_deref(), Some("0"));
        assert_eq!(
            result
                .native_results
                .get("actual_unique_proportion")
                .map(String::as_str),
            Some("0")
        );
    }

    #[test]
    fn unique_proportion_between() {
        let profile = Profile {
            row_count: Some(100),
            fields: vec![FieldProfile {
                unique_count: Some(90),
                ..FieldProfile::named("id")
            }],
            ..Default::default()
        };
        assert!(run(
            &check("column_unique_proportion_between", Some("id"), &[("min_value", "0.8")]),
            Some(&profile)
        )
        .success);
        assert!(!run(
            &check("column_unique_proportion_between", Some("id"), &[("min_value", "0.95")]),
            Some(&profile)
        )
        .success);
    }

    #[test]
    fn null_count_equals() {
        let profile = Profile {
            fields: vec![FieldProfile {
                null_count: Some(4),
                ..FieldProfile::named("opt")
            }],
            ..Default::default()
        };
        assert!(run(&check("column_null_count_equals", Some("opt"), &[("value", "4")]), Some(&profile)).success);
        assert!(!run(&check("column_null_count_equals", Some("opt"), &[("value", "0")]), Some(&profile)).success);
    }

    #[test]
    fn profile_age_check() {
        let fresh = Profile {
            timestamp: Some(Utc::now() - Duration::seconds(60)),
            ..Default::default()
        };
        assert!(run(
            &check("table_profile_age", None, &[("max_age_seconds", "3600")]),
            Some(&fresh)
        )
        .success);

        let stale = Profile {
            timestamp: Some(Utc::now() - Duration::seconds(7200)),
            ..Default::default()
        };
        assert!(!run(
            &check("table_profile_age", None, &[("max_age_seconds", "3600")]),
            Some(&stale)
        )
        .success);

        let missing_param = run(&check("table_profile_age", None, &[]), Some(&fresh));
        assert!(!missing_param.success);
        assert!(missing_param
            .error_message()
            .unwrap()
            .contains("max_age_seconds"));
    }
}
