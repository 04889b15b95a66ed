//! Typed per-platform source configurations.
//!
//! Raw catalog blobs are parsed into these structs when a source is
//! selected. Unknown fields are preserved in `extra` so configs written for
//! newer connector versions still round-trip. `Debug` output masks
//! credential fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use datapulse_core::pattern::glob_match;
use datapulse_core::{QualityError, Result};

use crate::secrets::{contains_placeholder, unresolved_secret_error};

const REDACTED: &str = "***REDACTED***";

/// Allow/deny lists of shell globs applied to one name level.
///
/// Deny patterns are evaluated first; an empty allow list accepts anything
/// not denied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllowDenyPattern {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

impl AllowDenyPattern {
    /// A pattern list allowing only the given globs.
    pub fn allowing(allow: &[&str]) -> Self {
        Self {
            allow: allow.iter().map(|s| s.to_string()).collect(),
            deny: Vec::new(),
        }
    }

    /// Whether any allow or deny pattern was explicitly configured.
    pub fn is_configured(&self) -> bool {
        !self.allow.is_empty() || !self.deny.is_empty()
    }

    pub fn allows(&self, value: &str) -> bool {
        if self.deny.iter().any(|p| glob_match(p, value)) {
            return false;
        }
        if self.allow.is_empty() {
            return true;
        }
        self.allow.iter().any(|p| glob_match(p, value))
    }
}

/// Snowflake source configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SnowflakeConfig {
    pub account_id: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub warehouse: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub database_pattern: AllowDenyPattern,
    #[serde(default)]
    pub schema_pattern: AllowDenyPattern,
    #[serde(default)]
    pub table_pattern: AllowDenyPattern,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl fmt::Debug for SnowflakeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeConfig")
            .field("account_id", &self.account_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("warehouse", &self.warehouse)
            .field("role", &self.role)
            .field("database_pattern", &self.database_pattern)
            .field("schema_pattern", &self.schema_pattern)
            .field("table_pattern", &self.table_pattern)
            .finish()
    }
}

/// Postgres/MySQL-style host-port source configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct HostPortConfig {
    pub host_port: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub database_pattern: AllowDenyPattern,
    #[serde(default)]
    pub schema_pattern: AllowDenyPattern,
    #[serde(default)]
    pub table_pattern: AllowDenyPattern,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl fmt::Debug for HostPortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostPortConfig")
            .field("host_port", &self.host_port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("database", &self.database)
            .field("database_pattern", &self.database_pattern)
            .field("schema_pattern", &self.schema_pattern)
            .field("table_pattern", &self.table_pattern)
            .finish()
    }
}

/// Embedded SQLite source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Filesystem path of the database, or `:memory:`.
    pub path: String,
    #[serde(default)]
    pub table_pattern: AllowDenyPattern,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A parsed, platform-specific source configuration.
#[derive(Debug, Clone)]
pub enum PlatformConfig {
    Snowflake(SnowflakeConfig),
    Postgres(HostPortConfig),
    MySql(HostPortConfig),
    Sqlite(SqliteConfig),
}

impl PlatformConfig {
    /// Parse a raw (secret-resolved) config blob for the given platform.
    ///
    /// Returns `Ok(None)` for platforms without a typed config; such
    /// sources can still be selected by name but cannot produce a
    /// connection string.
    pub fn parse(platform: &str, config: &Value) -> Result<Option<Self>> {
        let parsed = match platform {
            "snowflake" => Self::Snowflake(from_value(platform, config)?),
            "postgres" | "postgresql" => Self::Postgres(from_value(platform, config)?),
            "mysql" => Self::MySql(from_value(platform, config)?),
            "sqlite" => Self::Sqlite(from_value(platform, config)?),
            _ => return Ok(None),
        };
        Ok(Some(parsed))
    }

    /// The configured allow/deny patterns at each name level.
    pub fn pattern_levels(&self) -> [&AllowDenyPattern; 3] {
        static EMPTY: AllowDenyPattern = AllowDenyPattern {
            allow: Vec::new(),
            deny: Vec::new(),
        };
        match self {
            PlatformConfig::Snowflake(c) => {
                [&c.database_pattern, &c.schema_pattern, &c.table_pattern]
            }
            PlatformConfig::Postgres(c) | PlatformConfig::MySql(c) => {
                [&c.database_pattern, &c.schema_pattern, &c.table_pattern]
            }
            PlatformConfig::Sqlite(c) => [&EMPTY, &EMPTY, &c.table_pattern],
        }
    }

    /// Whether the source carries a stable account/tenant identifier.
    pub fn has_account_id(&self) -> bool {
        matches!(self, PlatformConfig::Snowflake(c) if !c.account_id.is_empty())
    }

    /// Whether the source carries an instance/namespace discriminator.
    pub fn has_instance_discriminator(&self) -> bool {
        match self {
            PlatformConfig::Snowflake(c) => c.warehouse.is_some(),
            PlatformConfig::Postgres(c) | PlatformConfig::MySql(c) => !c.host_port.is_empty(),
            PlatformConfig::Sqlite(c) => !c.path.is_empty(),
        }
    }

    /// Build the connection string for this source.
    ///
    /// Fails without leaking credentials when a required field still holds
    /// an unresolved `${NAME}` placeholder.
    pub fn connection_string(&self) -> Result<String> {
        match self {
            PlatformConfig::Snowflake(c) => {
                ensure_resolved("account_id", &c.account_id)?;
                ensure_resolved("username", &c.username)?;
                let mut url = authority_url("snowflake", &c.account_id, &c.username, c.password.as_deref())?;
                {
                    let mut query = url.query_pairs_mut();
                    if let Some(warehouse) = &c.warehouse {
                        query.append_pair("warehouse", warehouse);
                    }
                    if let Some(role) = &c.role {
                        query.append_pair("role", role);
                    }
                }
                Ok(url.to_string())
            }
            PlatformConfig::Postgres(c) => host_port_url("postgresql", c),
            PlatformConfig::MySql(c) => host_port_url("mysql", c),
            PlatformConfig::Sqlite(c) => Ok(format!("sqlite://{}", c.path)),
        }
    }
}

fn from_value<T: serde::de::DeserializeOwned>(platform: &str, config: &Value) -> Result<T> {
    serde_json::from_value(config.clone()).map_err(|err| {
        QualityError::Config(format!("invalid {platform} source config: {err}"))
    })
}

fn ensure_resolved(field: &str, value: &str) -> Result<()> {
    if contains_placeholder(value) {
        return Err(unresolved_secret_error(field));
    }
    Ok(())
}

fn authority_url(scheme: &str, authority: &str, username: &str, password: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&format!("{scheme}://{authority}"))
        .map_err(|err| QualityError::Config(format!("invalid {scheme} authority: {err}")))?;
    url.set_username(username)
        .map_err(|()| QualityError::Config(format!("cannot set username on {scheme} URL")))?;
    if let Some(password) = password {
        if contains_placeholder(password) {
            return Err(unresolved_secret_error("password"));
        }
        url.set_password(Some(password))
            .map_err(|()| QualityError::Config(format!("cannot set password on {scheme} URL")))?;
    }
    Ok(url)
}

fn host_port_url(scheme: &str, config: &HostPortConfig) -> Result<String> {
    ensure_resolved("host_port", &config.host_port)?;
    ensure_resolved("username", &config.username)?;
    let mut url = authority_url(scheme, &config.host_port, &config.username, config.password.as_deref())?;
    if let Some(database) = &config.database {
        url.set_path(database);
    }
    Ok(url.to_string())
}
