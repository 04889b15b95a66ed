//! DataPulse Connectors
//!
//! Connection resolution for query-based data quality checks. Given a
//! dataset reference, the [`ConnectorRegistry`] determines which configured
//! source owns that dataset and hands out a connection for it:
//!
//! 1. an explicit per-platform override, if registered;
//! 2. a source selected from the [`SourceCatalog`] by pattern matching and
//!    scoring over all same-platform candidates;
//! 3. a `{PLATFORM}_CONNECTION_STRING` environment fallback.
//!
//! Source credentials travel as `${NAME}` placeholders and are resolved
//! through a [`SecretResolver`] immediately before use. Resolved values are
//! never logged and never serialized.

pub mod catalog;
pub mod connection;
pub mod matching;
pub mod platform;
pub mod registry;
pub mod secrets;

pub use catalog::{SourceCatalog, SourceConfig, StaticCatalog};
pub use connection::{
    ConnectionHandle, QueryLimits, QueryOutput, SqlConnection, SqlDialect, SqlValue,
    SqliteConnection,
};
pub use matching::select_source;
pub use platform::{AllowDenyPattern, PlatformConfig};
pub use registry::ConnectorRegistry;
pub use secrets::{resolve_placeholders, EnvSecretResolver, SecretResolver, StaticSecretResolver};
