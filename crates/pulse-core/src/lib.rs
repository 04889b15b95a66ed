//! DataPulse Core
//!
//! Shared types for the DataPulse data quality engine: dataset references,
//! profiles, check configuration, check results, and assertion records.
//!
//! This crate is deliberately free of I/O and logging dependencies; the
//! connector, check, and executor crates build on top of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod assertion;
pub mod dataset;
pub mod error;
pub mod pattern;
pub mod profile;
pub mod validation;

pub use assertion::{
    assertion_urn, AssertionAggregation, AssertionDefinition, AssertionOperator,
    AssertionOutcome, AssertionParameters, AssertionRecord, AssertionScope, CheckCategory,
};
pub use dataset::{DatasetRef, TableAddress};
pub use error::{QualityError, Result};
pub use profile::{FieldProfile, Profile};

/// Configuration for a single data quality check.
///
/// Supplied by the surrounding configuration layer and read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Unique name for this check.
    pub name: String,
    /// Check type key, e.g. `table_row_count` or `column_value_range`.
    #[serde(rename = "type")]
    pub check_type: String,
    /// Shell-glob pattern matched against the full dataset identifier.
    pub dataset_pattern: String,
    /// Column name for column-level checks.
    #[serde(default)]
    pub column: Option<String>,
    /// Check-specific parameters (e.g. `min_rows`, `max_value`, `regex`).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl CheckConfig {
    /// Whether this check applies to the given dataset identifier.
    pub fn matches(&self, dataset_id: &str) -> bool {
        pattern::glob_match(&self.dataset_pattern, dataset_id)
    }

    /// Look up a parameter by key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Result of executing a single check.
///
/// Created fresh per execution and never mutated afterwards. A failed result
/// always carries a human-readable explanation in `native_results` (under
/// `"error"` for faults, or the recorded metrics plus `"status"` for a clean
/// fail).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub success: bool,
    /// The observed value the check judged, stringified.
    #[serde(default)]
    pub actual_value: Option<String>,
    /// Row count observed by query-based checks.
    #[serde(default)]
    pub row_count: Option<i64>,
    /// Diagnostic metrics keyed by name.
    #[serde(default)]
    pub native_results: BTreeMap<String, String>,
}

impl CheckResult {
    /// A pass/fail verdict; records `"status"` as `PASS` or `FAIL`.
    pub fn judged(success: bool) -> Self {
        let mut native_results = BTreeMap::new();
        native_results.insert(
            "status".to_string(),
            if success { "PASS" } else { "FAIL" }.to_string(),
        );
        Self {
            success,
            actual_value: None,
            row_count: None,
            native_results,
        }
    }

    /// A failed result explained by `message` under `native_results["error"]`.
    ///
    /// Used for every "could not evaluate" case: missing profile, missing
    /// column, missing connection, query faults. Never panic instead.
    pub fn error(message: impl Into<String>) -> Self {
        let mut native_results = BTreeMap::new();
        native_results.insert("error".to_string(), message.into());
        Self {
            success: false,
            actual_value: None,
            row_count: None,
            native_results,
        }
    }

    pub fn with_actual(mut self, value: impl ToString) -> Self {
        self.actual_value = Some(value.to_string());
        self
    }

    pub fn with_row_count(mut self, rows: i64) -> Self {
        self.row_count = Some(rows);
        self
    }

    pub fn with_metric(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.native_results.insert(key.into(), value.to_string());
        self
    }

    /// The diagnostic message for a faulted result, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.native_results.get("error").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_config_glob_matching() {
        let check = CheckConfig {
            name: "orders_volume".to_string(),
            check_type: "table_row_count".to_string(),
            dataset_pattern: "urn:li:dataset:(urn:li:dataPlatform:mysql,*orders*,PROD)".to_string(),
            column: None,
            params: BTreeMap::new(),
        };
        assert!(check.matches("urn:li:dataset:(urn:li:dataPlatform:mysql,shop.orders,PROD)"));
        assert!(!check.matches("urn:li:dataset:(urn:li:dataPlatform:mysql,shop.users,PROD)"));
    }

    #[test]
    fn judged_result_records_status() {
        let pass = CheckResult::judged(true);
        assert!(pass.success);
        assert_eq!(pass.native_results.get("status").map(String::as_str), Some("PASS"));

        let fail = CheckResult::judged(false);
        assert!(!fail.success);
        assert_eq!(fail.native_results.get("status").map(String::as_str), Some("FAIL"));
    }

    #[test]
    fn error_result_always_carries_explanation() {
        let result = CheckResult::error("profile data not available");
        assert!(!result.success);
        assert_eq!(result.error_message(), Some("profile data not available"));
    }

    #[test]
    fn check_config_deserializes_with_defaults() {
        let check: CheckConfig = serde_json::from_str(
            r#"{"name": "t", "type": "table_row_count", "dataset_pattern": "*"}"#,
        )
        .unwrap();
        assert!(check.column.is_none());
        assert!(check.params.is_empty());
    }
}
