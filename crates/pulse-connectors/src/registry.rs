//! The connector registry: connection resolution and handle caching.
//!
//! Resolution order for a dataset's connection string:
//!
//! 1. an explicit per-platform override;
//! 2. a catalog source selected by [`select_source`], with its typed,
//!    secret-resolved config turned into a connection string;
//! 3. the `{PLATFORM}_CONNECTION_STRING` environment variable.
//!
//! Each tier is consulted only when the previous one produced nothing.
//! Catalog listings are cached until explicitly invalidated; native handles
//! are cached per platform and must be released back via [`release`] and
//! closed at shutdown via [`close_all`].
//!
//! [`release`]: ConnectorRegistry::release
//! [`close_all`]: ConnectorRegistry::close_all

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use datapulse_core::DatasetRef;

use crate::catalog::{SourceCatalog, SourceConfig};
use crate::connection::{ConnectionHandle, SqlConnection, SqliteConnection};
use crate::matching::select_source;
use crate::platform::PlatformConfig;
use crate::secrets::{resolve_placeholders, SecretResolver};

/// Default capacity of the per-platform handle cache.
const HANDLE_CACHE_CAPACITY: usize = 16;

/// Registry of data-source connections for query-based checks.
pub struct ConnectorRegistry {
    catalog: Box<dyn SourceCatalog>,
    secrets: Box<dyn SecretResolver>,
    overrides: Mutex<BTreeMap<String, String>>,
    /// Catalog listing, cached for the registry's lifetime until
    /// `invalidate_sources` drops it. No TTL.
    sources: Mutex<Option<Vec<SourceConfig>>>,
    /// Cached native handles, keyed by platform.
    handles: Mutex<LruCache<String, Box<dyn SqlConnection>>>,
}

impl ConnectorRegistry {
    pub fn new(catalog: Box<dyn SourceCatalog>, secrets: Box<dyn SecretResolver>) -> Self {
        let capacity =
            NonZeroUsize::new(HANDLE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            catalog,
            secrets,
            overrides: Mutex::new(BTreeMap::new()),
            sources: Mutex::new(None),
            handles: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Add explicit per-platform connection-string overrides.
    pub fn with_overrides(self, overrides: BTreeMap<String, String>) -> Self {
        *self.overrides.lock() = overrides;
        self
    }

    /// Register (or replace) an override for a platform, evicting any cached
    /// handle built from the previous configuration.
    pub fn register_override(&self, platform: &str, connection_string: impl Into<String>) {
        self.overrides
            .lock()
            .insert(platform.to_string(), connection_string.into());
        if self.handles.lock().pop(platform).is_some() {
            debug!(platform, "evicted cached handle after override registration");
        }
    }

    /// Drop the cached catalog listing so the next lookup refetches it.
    pub fn invalidate_sources(&self) {
        *self.sources.lock() = None;
        debug!("source catalog cache invalidated");
    }

    /// The source that owns `dataset`, per the matching algorithm.
    ///
    /// Pure with respect to the cached candidate list: same candidates and
    /// dataset always select the same source.
    pub fn select_source(&self, dataset: &DatasetRef) -> Option<SourceConfig> {
        let candidates = self.resolved_candidates(dataset.platform());
        select_source(&candidates, dataset).cloned()
    }

    /// Resolve the connection string for `dataset`, walking the three tiers.
    pub fn connection_string(&self, dataset: &DatasetRef) -> Option<String> {
        let platform = dataset.platform();

        if let Some(explicit) = self.overrides.lock().get(platform) {
            debug!(platform, "using explicit connector override");
            return Some(explicit.clone());
        }

        let candidates = self.resolved_candidates(platform);
        if let Some(source) = select_source(&candidates, dataset) {
            match PlatformConfig::parse(&source.platform, &source.config) {
                Ok(Some(config)) => match config.connection_string() {
                    Ok(connection_string) => {
                        info!(platform, source = %source.name, "built connection string from catalog source");
                        return Some(connection_string);
                    }
                    Err(err) => {
                        warn!(platform, source = %source.name, error = %err, "cannot build connection string from selected source");
                    }
                },
                Ok(None) => {
                    warn!(
                        platform,
                        source = %source.name,
                        "platform has no typed connection builder; configure an override or environment fallback"
                    );
                }
                Err(err) => {
                    warn!(platform, source = %source.name, error = %err, "selected source config failed to parse");
                }
            }
        }

        let env_var = format!("{}_CONNECTION_STRING", platform.to_uppercase());
        if let Ok(from_env) = std::env::var(&env_var) {
            debug!(platform, env_var = %env_var, "using environment connection string");
            return Some(from_env);
        }

        debug!(
            platform,
            "no connection configuration found; query-based checks will be skipped"
        );
        None
    }

    /// Whether any tier can produce a connection string for `dataset`.
    pub fn has_connector(&self, dataset: &DatasetRef) -> bool {
        self.connection_string(dataset).is_some()
    }

    /// Check out a platform-native connection for `dataset`.
    ///
    /// Returns `None` when no connection string resolves or when the
    /// platform has no native builder; callers fall back to skipping
    /// query-based checks, this is not an error.
    ///
    /// Known correctness gap, kept deliberately visible: handles are cached
    /// by platform only, so when several same-platform sources exist a
    /// released handle from one source can be reused for a dataset that
    /// selects another. `register_override` and `close_all` evict.
    pub fn checkout(&self, dataset: &DatasetRef) -> Option<ConnectionHandle> {
        let platform = dataset.platform();

        if let Some(cached) = self.handles.lock().pop(platform) {
            debug!(platform, "reusing cached connection handle");
            return Some(ConnectionHandle::new(platform, None, cached));
        }

        let connection_string = self.connection_string(dataset)?;
        let connection: Box<dyn SqlConnection> = match platform {
            "sqlite" => match SqliteConnection::from_connection_string(&connection_string) {
                Ok(conn) => Box::new(conn),
                Err(err) => {
                    warn!(platform, error = %err, "cannot open native connection");
                    return None;
                }
            },
            _ => {
                debug!(platform, "no native connection builder for platform");
                return None;
            }
        };

        info!(platform, "opened native connection");
        Some(ConnectionHandle::new(
            platform,
            Some(connection_string),
            connection,
        ))
    }

    /// Return a handle to the cache for reuse within this process.
    pub fn release(&self, handle: ConnectionHandle) {
        let platform = handle.platform().to_string();
        self.handles.lock().put(platform, handle.into_connection());
    }

    /// Close every cached handle. Call during graceful shutdown.
    pub fn close_all(&self) {
        let mut handles = self.handles.lock();
        let count = handles.len();
        while handles.pop_lru().is_some() {}
        if count > 0 {
            info!(count, "closed all cached connection handles");
        }
    }

    /// Number of currently cached handles.
    pub fn cached_handles(&self) -> usize {
        self.handles.lock().len()
    }

    /// List, cache, and secret-resolve the catalog candidates for one
    /// platform. Catalog failures degrade to an empty candidate list with a
    /// warning, mirroring how a missing catalog behaves.
    fn resolved_candidates(&self, platform: &str) -> Vec<SourceConfig> {
        let mut cache = self.sources.lock();
        if cache.is_none() {
            match self.catalog.list_sources() {
                Ok(listed) => {
                    info!(count = listed.len(), "loaded source catalog");
                    *cache = Some(listed);
                }
                Err(err) => {
                    warn!(error = %err, "source catalog unavailable; continuing without catalog sources");
                    *cache = Some(Vec::new());
                }
            }
        }

        cache
            .as_ref()
            .map(|sources| {
                sources
                    .iter()
                    .filter(|source| source.platform == platform)
                    .map(|source| {
                        let (config, _unresolved) =
                            resolve_placeholders(self.secrets.as_ref(), &source.config);
                        SourceConfig {
                            name: source.name.clone(),
                            platform: source.platform.clone(),
                            config,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Drop for ConnectorRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}
