//! Source catalog: the inventory of configured data-source connections.
//!
//! The catalog is an external collaborator; the registry only needs a way to
//! list named, platform-tagged source configurations. Raw configuration
//! blobs stay untyped here and are parsed into per-platform structs when a
//! source is actually selected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use datapulse_core::Result;

/// One configured source: a named, platform-tagged connection template.
///
/// Immutable once fetched. The `config` blob may contain `${NAME}` secret
/// placeholders; it is resolved through the secret resolver before use and
/// the resolved form is never cached or serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Human-assigned source name, e.g. `snowflake-prod`.
    pub name: String,
    /// Platform tag, e.g. `snowflake`, `postgres`, `sqlite`.
    pub platform: String,
    /// Raw, platform-specific configuration.
    #[serde(default)]
    pub config: Value,
}

/// Inventory of configured sources.
pub trait SourceCatalog: Send + Sync {
    /// List every configured source. Order matters: it is the documented
    /// tie-break for source selection (first listed wins).
    fn list_sources(&self) -> Result<Vec<SourceConfig>>;
}

/// A fixed, in-memory catalog.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    sources: Vec<SourceConfig>,
}

impl StaticCatalog {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self { sources }
    }
}

impl SourceCatalog for StaticCatalog {
    fn list_sources(&self) -> Result<Vec<SourceConfig>> {
        Ok(self.sources.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn static_catalog_preserves_order() {
        let catalog = StaticCatalog::new(vec![
            SourceConfig {
                name: "first".into(),
                platform: "postgres".into(),
                config: json!({}),
            },
            SourceConfig {
                name: "second".into(),
                platform: "postgres".into(),
                config: json!({}),
            },
        ]);
        let listed = catalog.list_sources().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "first");
        assert_eq!(listed[1].name, "second");
    }

    #[test]
    fn source_config_deserializes_without_config_blob() {
        let source: SourceConfig =
            serde_json::from_str(r#"{"name": "pg", "platform": "postgres"}"#).unwrap();
        assert!(source.config.is_null());
    }
}
