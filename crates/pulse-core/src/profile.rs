//! Cached dataset profiles.
//!
//! A profile is the summary-statistics snapshot the metadata store keeps for
//! a dataset: row/column counts, a capture timestamp, and per-column
//! aggregates. Profile-based checks read these instead of querying the
//! source system. Every field is optional; validators report a diagnostic
//! when the statistic they need is missing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary statistics for a dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Number of rows at profiling time.
    #[serde(default)]
    pub row_count: Option<i64>,
    /// Number of columns at profiling time.
    #[serde(default)]
    pub column_count: Option<i64>,
    /// When the profile was captured.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Per-column statistics.
    #[serde(default)]
    pub fields: Vec<FieldProfile>,
}

impl Profile {
    /// Look up the statistics for a column by its field path.
    pub fn field(&self, field_path: &str) -> Option<&FieldProfile> {
        self.fields.iter().find(|f| f.field_path == field_path)
    }
}

/// Summary statistics for a single column.
///
/// `min`/`max` stay stringly typed since profiled columns may hold dates or
/// text; numeric validators parse them and report a diagnostic on failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldProfile {
    /// Column path within the dataset schema.
    pub field_path: String,
    #[serde(default)]
    pub null_count: Option<i64>,
    #[serde(default)]
    pub unique_count: Option<i64>,
    #[serde(default)]
    pub min: Option<String>,
    #[serde(default)]
    pub max: Option<String>,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub median: Option<f64>,
    #[serde(default)]
    pub stddev: Option<f64>,
}

impl FieldProfile {
    /// An empty profile for the named column.
    pub fn named(field_path: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            ..Default::default()
        }
    }
}
