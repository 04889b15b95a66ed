//! Structured dataset references.
//!
//! Dataset identifiers arrive as structured strings of the form
//! `urn:li:dataset:(urn:li:dataPlatform:<platform>,<name>,<ENV>)`, where
//! `<name>` is a dot-separated qualified name (commonly
//! `database.schema.table`, but possibly more segments). Parsing failures are
//! hard errors; callers are expected to reject malformed identifiers rather
//! than guess.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QualityError, Result};

const URN_PREFIX: &str = "urn:li:dataset:(urn:li:dataPlatform:";
const URN_SUFFIX: char = ')';

/// A parsed dataset identifier: platform, qualified name, environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    platform: String,
    name: String,
    env: String,
}

impl DatasetRef {
    /// Build a reference from parts, validating the platform/name invariant.
    pub fn new(
        platform: impl Into<String>,
        name: impl Into<String>,
        env: impl Into<String>,
    ) -> Result<Self> {
        let platform = platform.into();
        let name = name.into();
        let env = env.into();
        if platform.is_empty() {
            return Err(QualityError::InvalidDatasetRef(
                "platform cannot be empty".to_string(),
            ));
        }
        if name.is_empty() || name.split('.').any(str::is_empty) {
            return Err(QualityError::InvalidDatasetRef(format!(
                "qualified name '{name}' must have non-empty dot-separated components"
            )));
        }
        Ok(Self {
            platform,
            name,
            env,
        })
    }

    /// Platform token, e.g. `snowflake`, `postgres`, `sqlite`.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Dot-separated qualified name, e.g. `sales.public.orders`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Environment token, e.g. `PROD`.
    pub fn env(&self) -> &str {
        &self.env
    }

    /// The full identifier string this reference round-trips to.
    pub fn urn(&self) -> String {
        format!("{URN_PREFIX}{},{},{}{URN_SUFFIX}", self.platform, self.name, self.env)
    }

    /// All dot-separated name components, in order.
    pub fn name_parts(&self) -> Vec<&str> {
        self.name.split('.').collect()
    }

    /// The trailing components significant for source matching.
    ///
    /// Only the last three segments matter: longer names keep their tail, a
    /// two-segment name has no database, a bare table has neither database
    /// nor schema.
    pub fn table_address(&self) -> TableAddress<'_> {
        let parts = self.name_parts();
        match parts.len() {
            0 => unreachable!("constructor rejects empty names"),
            1 => TableAddress {
                database: None,
                schema: None,
                table: parts[0],
            },
            2 => TableAddress {
                database: None,
                schema: Some(parts[0]),
                table: parts[1],
            },
            n => TableAddress {
                database: Some(parts[n - 3]),
                schema: Some(parts[n - 2]),
                table: parts[n - 1],
            },
        }
    }
}

impl FromStr for DatasetRef {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix(URN_PREFIX)
            .and_then(|rest| rest.strip_suffix(URN_SUFFIX))
            .ok_or_else(|| {
                QualityError::InvalidDatasetRef(format!(
                    "expected '{URN_PREFIX}<platform>,<name>,<env>{URN_SUFFIX}', got '{s}'"
                ))
            })?;

        let mut fields = body.splitn(3, ',');
        let platform = fields.next().unwrap_or_default();
        let name = fields.next().ok_or_else(|| {
            QualityError::InvalidDatasetRef(format!("missing qualified name in '{s}'"))
        })?;
        let env = fields.next().ok_or_else(|| {
            QualityError::InvalidDatasetRef(format!("missing environment in '{s}'"))
        })?;

        Self::new(platform, name, env)
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.urn())
    }
}

/// The trailing database/schema/table components of a dataset name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableAddress<'a> {
    pub database: Option<&'a str>,
    pub schema: Option<&'a str>,
    pub table: &'a str,
}

impl TableAddress<'_> {
    /// The schema qualified by database, when both are present.
    pub fn qualified_schema(&self) -> Option<String> {
        match (self.database, self.schema) {
            (Some(db), Some(schema)) => Some(format!("{db}.{schema}")),
            (None, Some(schema)) => Some(schema.to_string()),
            _ => None,
        }
    }

    /// The table qualified by every present component.
    pub fn qualified_table(&self) -> String {
        match (self.database, self.schema) {
            (Some(db), Some(schema)) => format!("{db}.{schema}.{}", self.table),
            (None, Some(schema)) => format!("{schema}.{}", self.table),
            _ => self.table.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_urn() {
        let dataset: DatasetRef = "urn:li:dataset:(urn:li:dataPlatform:snowflake,sales.public.orders,PROD)"
            .parse()
            .unwrap();
        assert_eq!(dataset.platform(), "snowflake");
        assert_eq!(dataset.name(), "sales.public.orders");
        assert_eq!(dataset.env(), "PROD");
    }

    #[test]
    fn round_trips_through_urn() {
        let raw = "urn:li:dataset:(urn:li:dataPlatform:mysql,shop.users,DEV)";
        let dataset: DatasetRef = raw.parse().unwrap();
        assert_eq!(dataset.urn(), raw);
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert!("invalid-urn".parse::<DatasetRef>().is_err());
        assert!("urn:li:dataset:(some,other,format)".parse::<DatasetRef>().is_err());
        assert!("urn:li:dataset:(urn:li:dataPlatform:mysql,table)"
            .parse::<DatasetRef>()
            .is_err());
        assert!("urn:li:dataset:(urn:li:dataPlatform:,db.table,PROD)"
            .parse::<DatasetRef>()
            .is_err());
        assert!("urn:li:dataset:(urn:li:dataPlatform:mysql,db..table,PROD)"
            .parse::<DatasetRef>()
            .is_err());
    }

    #[test]
    fn table_address_takes_trailing_components() {
        let three: DatasetRef = "urn:li:dataset:(urn:li:dataPlatform:snowflake,sales.public.orders,PROD)"
            .parse()
            .unwrap();
        let addr = three.table_address();
        assert_eq!(addr.database, Some("sales"));
        assert_eq!(addr.schema, Some("public"));
        assert_eq!(addr.table, "orders");
        assert_eq!(addr.qualified_schema().as_deref(), Some("sales.public"));
        assert_eq!(addr.qualified_table(), "sales.public.orders");

        let two: DatasetRef = "urn:li:dataset:(urn:li:dataPlatform:mysql,shop.users,PROD)"
            .parse()
            .unwrap();
        let addr = two.table_address();
        assert_eq!(addr.database, None);
        assert_eq!(addr.schema, Some("shop"));
        assert_eq!(addr.table, "users");

        // Longer names keep only the tail.
        let four: DatasetRef = "urn:li:dataset:(urn:li:dataPlatform:snowflake,acct.sales.public.orders,PROD)"
            .parse()
            .unwrap();
        let addr = four.table_address();
        assert_eq!(addr.database, Some("sales"));
        assert_eq!(addr.schema, Some("public"));
        assert_eq!(addr.table, "orders");
    }

    #[test]
    fn single_segment_name_is_bare_table() {
        let dataset: DatasetRef = "urn:li:dataset:(urn:li:dataPlatform:sqlite,events,PROD)"
            .parse()
            .unwrap();
        let addr = dataset.table_address();
        assert_eq!(addr.database, None);
        assert_eq!(addr.schema, None);
        assert_eq!(addr.qualified_table(), "events");
    }
}
