//! Secret indirection for source configurations.
//!
//! Source configs reference credentials as `${NAME}` placeholders. Before a
//! config is matched or turned into a connection, every placeholder is
//! substituted through a [`SecretResolver`]. Unresolvable placeholders are
//! left untouched and logged **by name only**; connection building with a
//! literal placeholder then fails with an error that does not contain the
//! secret. A failing secret store degrades the same way: a warning plus
//! pass-through, never a hard stop.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use datapulse_core::{QualityError, Result};

/// Provider of secret values by name.
pub trait SecretResolver: Send + Sync {
    /// Fetch one secret. `Ok(None)` means the secret is not configured;
    /// `Err` means the store itself failed.
    fn secret(&self, name: &str) -> Result<Option<String>>;
}

/// Resolves secrets from process environment variables.
#[derive(Debug, Default)]
pub struct EnvSecretResolver;

impl SecretResolver for EnvSecretResolver {
    fn secret(&self, name: &str) -> Result<Option<String>> {
        Ok(std::env::var(name).ok())
    }
}

/// A fixed map of secrets, for embedding and tests.
#[derive(Default)]
pub struct StaticSecretResolver {
    values: BTreeMap<String, String>,
}

impl StaticSecretResolver {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

// Never expose stored secret values through Debug.
impl std::fmt::Debug for StaticSecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSecretResolver")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SecretResolver for StaticSecretResolver {
    fn secret(&self, name: &str) -> Result<Option<String>> {
        Ok(self.values.get(name).cloned())
    }
}

/// Substitute every `${NAME}` placeholder in `config`, returning the
/// resolved config and the names that could not be resolved.
///
/// Each distinct secret is fetched at most once per call. Store failures are
/// downgraded to warnings; the affected placeholders pass through literally.
pub fn resolve_placeholders(
    resolver: &dyn SecretResolver,
    config: &Value,
) -> (Value, Vec<String>) {
    let mut cache: BTreeMap<String, Option<String>> = BTreeMap::new();
    let mut unresolved: Vec<String> = Vec::new();
    let resolved = substitute_value(resolver, config, &mut cache, &mut unresolved);
    unresolved.sort();
    unresolved.dedup();
    if !unresolved.is_empty() {
        // Names only; values never reach the log.
        warn!(secrets = ?unresolved, "unresolved secret placeholders left as literals");
    }
    (resolved, unresolved)
}

fn substitute_value(
    resolver: &dyn SecretResolver,
    value: &Value,
    cache: &mut BTreeMap<String, Option<String>>,
    unresolved: &mut Vec<String>,
) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_string(resolver, s, cache, unresolved)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| substitute_value(resolver, v, cache, unresolved))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_value(resolver, v, cache, unresolved)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn substitute_string(
    resolver: &dyn SecretResolver,
    input: &str,
    cache: &mut BTreeMap<String, Option<String>>,
    unresolved: &mut Vec<String>,
) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if is_secret_name(&after[..end]) => {
                let name = &after[..end];
                let fetched = cache
                    .entry(name.to_string())
                    .or_insert_with(|| lookup(resolver, name));
                match fetched {
                    Some(value) => out.push_str(value),
                    None => {
                        unresolved.push(name.to_string());
                        out.push_str(&rest[start..start + 2 + end + 1]);
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                // Not a placeholder; keep the literal "${" and move on.
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn lookup(resolver: &dyn SecretResolver, name: &str) -> Option<String> {
    match resolver.secret(name) {
        Ok(found) => {
            if found.is_some() {
                debug!(secret = name, "resolved secret placeholder");
            }
            found
        }
        Err(err) => {
            // Degraded mode: the store failed, the placeholder stays literal.
            warn!(secret = name, error = %err, "secret store failure, leaving placeholder");
            None
        }
    }
}

fn is_secret_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Error for connection building that found a literal placeholder where a
/// credential was required.
pub(crate) fn unresolved_secret_error(field: &str) -> QualityError {
    QualityError::Secret(format!(
        "field '{field}' still contains an unresolved secret placeholder"
    ))
}

/// Whether a string still carries a `${NAME}` placeholder.
pub(crate) fn contains_placeholder(value: &str) -> bool {
    if let Some(start) = value.find("${") {
        if let Some(end) = value[start + 2..].find('}') {
            return is_secret_name(&value[start + 2..start + 2 + end]);
        }
    }
    false
}
