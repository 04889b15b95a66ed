//! DataPulse Executor
//!
//! Orchestration for one evaluation cycle: parse the dataset identifier,
//! match configured checks, fetch the cached profile, dispatch each check to
//! its validator, assemble assertion records, and emit them to the sink.
//!
//! Per-check faults never abort the batch (validators return failed results
//! instead of erroring), and emission failures are logged, not retried. The
//! only hard error out of [`QualityEvaluator::evaluate`] is a malformed
//! dataset identifier.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use datapulse_checks::{CheckContext, ExecutionFamily, ValidatorRegistry};
use datapulse_connectors::{ConnectorRegistry, QueryLimits};
use datapulse_core::{
    assertion_urn, AssertionDefinition, AssertionOutcome, AssertionRecord, CheckConfig,
    DatasetRef, Profile, Result,
};

/// Cached summary statistics, fetched per dataset from the metadata store.
pub trait ProfileStore: Send + Sync {
    /// The latest profile for a dataset, or `None` when never profiled.
    fn profile(&self, dataset: &DatasetRef) -> Result<Option<Profile>>;
}

/// A profile store with no profiles, for query-only deployments.
#[derive(Debug, Default)]
pub struct NoProfiles;

impl ProfileStore for NoProfiles {
    fn profile(&self, _dataset: &DatasetRef) -> Result<Option<Profile>> {
        Ok(None)
    }
}

/// Fixed in-memory profile store keyed by dataset identifier.
#[derive(Debug, Default)]
pub struct StaticProfileStore {
    profiles: HashMap<String, Profile>,
}

impl StaticProfileStore {
    pub fn with_profile(mut self, dataset_id: impl Into<String>, profile: Profile) -> Self {
        self.profiles.insert(dataset_id.into(), profile);
        self
    }
}

impl ProfileStore for StaticProfileStore {
    fn profile(&self, dataset: &DatasetRef) -> Result<Option<Profile>> {
        Ok(self.profiles.get(&dataset.urn()).cloned())
    }
}

/// Destination for assembled assertion records. Fire-and-forget: the
/// executor only observes success or failure of the call itself.
pub trait RecordSink: Send + Sync {
    fn emit(&self, records: &[AssertionRecord]) -> Result<()>;
}

/// Sink that collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AssertionRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<AssertionRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, records: &[AssertionRecord]) -> Result<()> {
        self.records.lock().extend_from_slice(records);
        Ok(())
    }
}

/// The evaluation entry point the event-dispatch layer calls once per
/// dataset event.
pub struct QualityEvaluator {
    checks: Vec<CheckConfig>,
    validators: ValidatorRegistry,
    connectors: ConnectorRegistry,
    profiles: Box<dyn ProfileStore>,
    sink: Box<dyn RecordSink>,
    limits: QueryLimits,
}

impl QualityEvaluator {
    pub fn new(
        connectors: ConnectorRegistry,
        profiles: Box<dyn ProfileStore>,
        sink: Box<dyn RecordSink>,
    ) -> Self {
        Self {
            checks: Vec::new(),
            validators: ValidatorRegistry::builtin(),
            connectors,
            profiles,
            sink,
            limits: QueryLimits::default(),
        }
    }

    /// Configure the checks to evaluate.
    pub fn with_checks(mut self, checks: Vec<CheckConfig>) -> Self {
        self.checks = checks;
        self
    }

    /// Override the validator registry (e.g. to add custom validators).
    pub fn with_validators(mut self, validators: ValidatorRegistry) -> Self {
        self.validators = validators;
        self
    }

    /// Override the live-query limits.
    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn connectors(&self) -> &ConnectorRegistry {
        &self.connectors
    }

    /// Evaluate every matching check for one dataset event.
    ///
    /// Returns the assembled records; they are also emitted to the sink. A
    /// malformed identifier is the only hard error; everything downstream
    /// degrades to per-check diagnostics.
    pub fn evaluate(&self, dataset_id: &str) -> Result<Vec<AssertionRecord>> {
        let dataset: DatasetRef = dataset_id.parse()?;
        info!(dataset = dataset_id, "evaluating data quality checks");

        let matching: Vec<&CheckConfig> = self
            .checks
            .iter()
            .filter(|check| check.matches(dataset_id))
            .collect();
        if matching.is_empty() {
            debug!(dataset = dataset_id, "no checks match this dataset");
            return Ok(Vec::new());
        }

        let profile = match self.profiles.profile(&dataset) {
            Ok(profile) => {
                if profile.is_none() {
                    warn!(dataset = dataset_id, "no profile data available");
                }
                profile
            }
            Err(err) => {
                warn!(dataset = dataset_id, error = %err, "profile retrieval failed");
                None
            }
        };

        // Only touch the connector registry when a matched check needs it.
        let needs_connection = matching.iter().any(|check| {
            self.validators
                .get(&check.check_type)
                .is_some_and(|v| v.family() == ExecutionFamily::Query)
        });
        let mut connection = if needs_connection {
            let handle = self.connectors.checkout(&dataset);
            if handle.is_none() {
                debug!(
                    dataset = dataset_id,
                    "no connection available; query-based checks will fail with a diagnostic"
                );
            }
            handle
        } else {
            None
        };

        let mut records = Vec::with_capacity(matching.len());
        for check in matching {
            let validator = match self.validators.get(&check.check_type) {
                Some(validator) => validator,
                None => {
                    warn!(check = %check.name, check_type = %check.check_type, "unknown check type, skipping");
                    continue;
                }
            };

            let mut ctx = CheckContext {
                check,
                dataset: &dataset,
                profile: profile.as_ref(),
                connection: connection.as_mut(),
                limits: self.limits,
            };
            let result = validator.execute(&mut ctx);
            info!(
                check = %check.name,
                check_type = %check.check_type,
                success = result.success,
                "check completed"
            );

            let urn = assertion_urn(
                validator.check_type(),
                &check.params,
                &dataset.urn(),
                check.column.as_deref(),
            );
            records.push(AssertionRecord {
                urn,
                definition: AssertionDefinition {
                    dataset: dataset.urn(),
                    column: check.column.clone(),
                    scope: validator.scope(),
                    operator: validator.operator(),
                    aggregation: validator.aggregation(),
                    category: validator.category(),
                    check_name: check.name.clone(),
                    native_type: validator.check_type().to_string(),
                    parameters: validator.parameters(check),
                    native_parameters: check.params.clone(),
                },
                outcome: AssertionOutcome::from_result(result, Utc::now()),
            });
        }

        if let Some(handle) = connection.take() {
            self.connectors.release(handle);
        }

        if !records.is_empty() {
            if let Err(err) = self.sink.emit(&records) {
                // Fire-and-forget: the caller still gets the records.
                warn!(dataset = dataset_id, error = %err, "failed to emit assertion records");
            }
        }

        info!(
            dataset = dataset_id,
            executed = records.len(),
            failed = records.iter().filter(|r| !r.outcome.success).count(),
            "evaluation complete"
        );
        Ok(records)
    }

    /// Release every pooled connection. Call during graceful shutdown.
    pub fn shutdown(&self) {
        self.connectors.close_all();
    }
}
