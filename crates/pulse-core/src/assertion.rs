//! Assertion records: the (definition, outcome) pair emitted per executed
//! check.
//!
//! Record identifiers are a pure function of what the check asserts (the
//! check type, its parameters, the dataset, and the column), so repeated
//! evaluations of the same check update the same logical record instead of
//! creating duplicates.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::CheckResult;

/// Namespace discriminator hashed into every assertion id.
pub const ASSERTION_NAMESPACE: &str = "datapulse";

/// What the assertion ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssertionScope {
    DatasetRows,
    DatasetSchema,
    DatasetColumn,
}

/// Comparison the assertion applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssertionOperator {
    Between,
    EqualTo,
    In,
    NotIn,
    RegexMatch,
    NotRegexMatch,
    LessThanOrEqualTo,
    Native,
}

/// Aggregate the assertion is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssertionAggregation {
    RowCount,
    ColumnCount,
    NullCount,
    UniqueCount,
    UniqueProportion,
    Min,
    Max,
    Mean,
    Median,
    Stddev,
    Length,
    Identity,
    Native,
}

/// Reporting category for a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckCategory {
    Volume,
    Schema,
    Completeness,
    Uniqueness,
    Column,
    Freshness,
    CustomSql,
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckCategory::Volume => "VOLUME",
            CheckCategory::Schema => "SCHEMA",
            CheckCategory::Completeness => "COMPLETENESS",
            CheckCategory::Uniqueness => "UNIQUENESS",
            CheckCategory::Column => "COLUMN",
            CheckCategory::Freshness => "FRESHNESS",
            CheckCategory::CustomSql => "CUSTOM_SQL",
        };
        write!(f, "{s}")
    }
}

/// Standardized bound/value parameters a check asserts against.
///
/// Stringly typed on purpose: parameters are reported exactly as
/// configured, alongside the raw `native_parameters` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionParameters {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub min_value: Option<String>,
    #[serde(default)]
    pub max_value: Option<String>,
}

impl AssertionParameters {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.min_value.is_none() && self.max_value.is_none()
    }
}

/// The definition half of an assertion record: what is being checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionDefinition {
    /// Full identifier of the dataset under check.
    pub dataset: String,
    /// Column under check, for column-scoped assertions.
    #[serde(default)]
    pub column: Option<String>,
    pub scope: AssertionScope,
    pub operator: AssertionOperator,
    pub aggregation: AssertionAggregation,
    pub category: CheckCategory,
    /// Configured check name.
    pub check_name: String,
    /// Native check type key, e.g. `table_row_count`.
    pub native_type: String,
    /// Standardized bound/value parameters.
    #[serde(default, skip_serializing_if = "AssertionParameters::is_empty")]
    pub parameters: AssertionParameters,
    /// The raw check parameters.
    pub native_parameters: BTreeMap<String, String>,
}

/// The outcome half of an assertion record: what the evaluation observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionOutcome {
    pub success: bool,
    #[serde(default)]
    pub actual_value: Option<String>,
    #[serde(default)]
    pub row_count: Option<i64>,
    pub native_results: BTreeMap<String, String>,
    pub evaluated_at: DateTime<Utc>,
}

impl AssertionOutcome {
    /// Build an outcome from a check result, stamped at `evaluated_at`.
    pub fn from_result(result: CheckResult, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            success: result.success,
            actual_value: result.actual_value,
            row_count: result.row_count,
            native_results: result.native_results,
            evaluated_at,
        }
    }
}

/// One executed check: a stable identifier plus definition and outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionRecord {
    pub urn: String,
    pub definition: AssertionDefinition,
    pub outcome: AssertionOutcome,
}

/// Deterministic assertion identifier.
///
/// SHA-256 over the canonical JSON of the identity fields. `BTreeMap`
/// parameters and serde_json's sorted object keys make the serialization,
/// and therefore the id, stable across runs and processes.
pub fn assertion_urn(
    native_type: &str,
    params: &BTreeMap<String, String>,
    dataset: &str,
    column: Option<&str>,
) -> String {
    let identity = serde_json::json!({
        "platform": ASSERTION_NAMESPACE,
        "nativeType": native_type,
        "nativeParameters": params,
        "dataset": dataset,
        "column": column,
    });
    let digest = Sha256::digest(identity.to_string().as_bytes());
    format!("urn:li:assertion:{digest:x}")
}
