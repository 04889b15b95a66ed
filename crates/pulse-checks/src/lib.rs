//! DataPulse Checks
//!
//! The pluggable check execution framework: one flat [`Validator`] contract,
//! a string-keyed [`ValidatorRegistry`], and the built-in check templates in
//! two families:
//!
//! - **profile-based** checks read cached summary statistics and perform no
//!   I/O ([`profile_based`]);
//! - **query-based** checks run guarded, bounded SQL through a resolved
//!   connection ([`query_based`]).
//!
//! Validators never panic and never throw: `execute` always returns a
//! [`CheckResult`], with failures explained in `native_results`.

use std::collections::HashMap;

use datapulse_connectors::{ConnectionHandle, QueryLimits};
use datapulse_core::{
    AssertionAggregation, AssertionOperator, AssertionParameters, AssertionScope, CheckCategory,
    CheckConfig, CheckResult, DatasetRef, Profile,
};

pub mod guardrail;
pub mod profile_based;
pub mod query_based;

mod params;

pub use guardrail::{ensure_read_only, is_read_only, parse_query_output, QueryVerdict};

/// Which execution context a validator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionFamily {
    /// Reads cached profile statistics; no network I/O.
    Profile,
    /// Issues live SQL through a resolved connection.
    Query,
}

/// Execution context handed to a validator.
///
/// Carries both possible inputs; each validator takes what its family needs
/// and reports a diagnostic failure when it is missing.
pub struct CheckContext<'a> {
    pub check: &'a CheckConfig,
    pub dataset: &'a DatasetRef,
    pub profile: Option<&'a Profile>,
    pub connection: Option<&'a mut ConnectionHandle>,
    pub limits: QueryLimits,
}

/// One check template.
///
/// All variants share this one method set; there is no hierarchy beyond the
/// two families.
pub trait Validator: Send + Sync {
    /// Native check type key, e.g. `table_row_count`.
    fn check_type(&self) -> &'static str;

    fn family(&self) -> ExecutionFamily;

    fn scope(&self) -> AssertionScope;

    fn operator(&self) -> AssertionOperator;

    fn aggregation(&self) -> AssertionAggregation;

    fn category(&self) -> CheckCategory;

    /// Standardized bound/value parameters this check asserts against.
    ///
    /// The default reads the common `value`/`min_value`/`max_value` keys;
    /// checks with their own key names override.
    fn parameters(&self, check: &CheckConfig) -> AssertionParameters {
        AssertionParameters {
            value: check.param("value").map(String::from),
            min_value: check.param("min_value").map(String::from),
            max_value: check.param("max_value").map(String::from),
        }
    }

    /// Run the check. Infallible by contract: faults become failed results
    /// with an `"error"` diagnostic, so one bad check can never abort a
    /// batch.
    fn execute(&self, ctx: &mut CheckContext<'_>) -> CheckResult;
}

/// Fixed mapping from check-type name to validator.
pub struct ValidatorRegistry {
    validators: HashMap<&'static str, Box<dyn Validator>>,
}

impl ValidatorRegistry {
    /// Registry with every built-in validator.
    pub fn builtin() -> Self {
        let mut registry = Self {
            validators: HashMap::new(),
        };
        profile_based::register(&mut registry);
        query_based::register(&mut registry);
        registry
    }

    /// An empty registry, for embedding custom validator sets.
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    pub fn register(&mut self, validator: Box<dyn Validator>) {
        self.validators.insert(validator.check_type(), validator);
    }

    pub fn get(&self, check_type: &str) -> Option<&dyn Validator> {
        self.validators
            .get(check_type)
            .map(|validator| validator.as_ref())
    }

    /// All registered check-type keys, sorted.
    pub fn check_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.validators.keys().copied().collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_covers_both_families() {
        let registry = ValidatorRegistry::builtin();
        assert!(registry.len() >= 20);

        let row_count = registry.get("table_row_count").unwrap();
        assert_eq!(row_count.family(), ExecutionFamily::Profile);

        let custom_sql = registry.get("table_custom_sql").unwrap();
        assert_eq!(custom_sql.family(), ExecutionFamily::Query);

        assert!(registry.get("no_such_check").is_none());
    }

    #[test]
    fn check_types_are_sorted_and_unique() {
        let registry = ValidatorRegistry::builtin();
        let types = registry.check_types();
        let mut deduped = types.clone();
        deduped.dedup();
        assert_eq!(types, deduped);
        let mut sorted = types.clone();
        sorted.sort_unstable();
        assert_eq!(types, sorted);
    }

    #[test]
    fn registry_keys_match_validator_check_types() {
        let registry = ValidatorRegistry::builtin();
        for check_type in registry.check_types() {
            assert_eq!(registry.get(check_type).unwrap().check_type(), check_type);
        }
    }
}
