//! Source selection: which configured source owns a dataset.
//!
//! Several sources of the same platform can be configured at once, each
//! scoped by allow/deny patterns over database, schema, and table names.
//! Selection filters the candidates by those patterns and scores the
//! survivors so that more specifically scoped sources outrank wildcard-only
//! ones. For a fixed candidate list and dataset the result is fully
//! deterministic: ties break by catalog order, first listed wins.

use tracing::{debug, warn};

use datapulse_core::{DatasetRef, TableAddress};

use crate::catalog::SourceConfig;
use crate::platform::PlatformConfig;

/// Weight for a stable account/tenant identifier on the source.
const SCORE_ACCOUNT_ID: u32 = 2;
/// Weight for an instance/namespace discriminator (warehouse, host).
const SCORE_INSTANCE: u32 = 1;
/// Weight for each explicitly configured pattern level.
const SCORE_PATTERN_LEVEL: u32 = 1;

/// Select the source that owns `dataset` from `candidates`.
///
/// Candidates are expected to be secret-resolved already. Candidates of
/// other platforms and candidates whose configured patterns reject any name
/// component are excluded; among the rest the highest score wins and ties
/// break by list order. `None` means the dataset has no query-based
/// capability; callers treat that as a skip, not an error.
pub fn select_source<'a>(
    candidates: &'a [SourceConfig],
    dataset: &DatasetRef,
) -> Option<&'a SourceConfig> {
    let address = dataset.table_address();
    let mut best: Option<(&SourceConfig, u32)> = None;

    for candidate in candidates {
        if candidate.platform != dataset.platform() {
            continue;
        }
        let score = match candidate_score(candidate, &address) {
            Some(score) => score,
            None => continue,
        };
        debug!(
            source = %candidate.name,
            platform = %candidate.platform,
            score,
            "source candidate matches dataset"
        );
        // Strictly-greater keeps the first listed candidate on ties.
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    best.map(|(source, _)| source)
}

/// Score one candidate against a table address, or `None` if it does not
/// match.
fn candidate_score(candidate: &SourceConfig, address: &TableAddress<'_>) -> Option<u32> {
    let config = match PlatformConfig::parse(&candidate.platform, &candidate.config) {
        Ok(Some(config)) => config,
        // Platforms without a typed config match by platform tag alone at
        // the lowest score; connection building decides later whether the
        // source is actually usable.
        Ok(None) => return Some(0),
        Err(err) => {
            warn!(source = %candidate.name, error = %err, "skipping unparseable source config");
            return None;
        }
    };

    let [database_pattern, schema_pattern, table_pattern] = config.pattern_levels();

    if database_pattern.is_configured() {
        let database = address.database.unwrap_or_default();
        if !database_pattern.allows(database) {
            return None;
        }
    }
    if schema_pattern.is_configured() {
        // Schemas may be configured bare or qualified as database.schema.
        let bare = address.schema.unwrap_or_default();
        let qualified = address.qualified_schema().unwrap_or_default();
        if !schema_pattern.allows(bare) && !schema_pattern.allows(&qualified) {
            return None;
        }
    }
    if table_pattern.is_configured() {
        let qualified = address.qualified_table();
        if !table_pattern.allows(address.table) && !table_pattern.allows(&qualified) {
            return None;
        }
    }

    let mut score = 0;
    if config.has_account_id() {
        score += SCORE_ACCOUNT_ID;
    }
    if config.has_instance_discriminator() {
        score += SCORE_INSTANCE;
    }
    for pattern in [database_pattern, schema_pattern, table_pattern] {
        if pattern.is_configured() {
            score += SCORE_PATTERN_LEVEL;
        }
    }
    Some(score)
}
