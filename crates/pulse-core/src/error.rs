//! Error taxonomy for DataPulse.

/// Errors that can occur while resolving connections or executing checks.
#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    /// Malformed dataset identifier.
    #[error("invalid dataset reference: {0}")]
    InvalidDatasetRef(String),

    /// No matching source and no connector for the platform. Not fatal:
    /// query-based checks are skipped for such datasets.
    #[error("no connection available for platform '{0}'")]
    NoConnection(String),

    /// SQL rejected by the read-only guardrail.
    #[error("unsafe SQL rejected: {0}")]
    UnsafeSql(String),

    /// Configured check type has no registered validator.
    #[error("unknown check type '{0}'")]
    UnknownCheckType(String),

    /// Live query exceeded its configured timeout.
    #[error("query exceeded timeout of {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Query or connection failure reported by a database driver.
    #[error("execution failed: {0}")]
    Execution(String),

    /// Secret store infrastructure failure (the store itself, not a missing
    /// secret; missing secrets degrade to literal placeholders).
    #[error("secret resolution failed: {0}")]
    Secret(String),

    /// Invalid configuration supplied by the caller.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid identifier or value rejected before use.
    #[error("validation error: {0}")]
    Validation(String),
}

impl QualityError {
    /// Whether the surrounding batch should skip past this error rather than
    /// abort: missing connections and unknown check types degrade to
    /// per-check diagnostics.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            QualityError::NoConnection(_) | QualityError::UnknownCheckType(_)
        )
    }

    /// Whether this error came from the timeout bound on live queries.
    pub fn is_timeout(&self) -> bool {
        matches!(self, QualityError::Timeout { .. })
    }
}

/// Result type for DataPulse operations.
pub type Result<T> = std::result::Result<T, QualityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skippable_classification() {
        assert!(QualityError::NoConnection("mysql".into()).is_skippable());
        assert!(QualityError::UnknownCheckType("bogus".into()).is_skippable());
        assert!(!QualityError::UnsafeSql("DROP".into()).is_skippable());
        assert!(!QualityError::InvalidDatasetRef("x".into()).is_skippable());
    }

    #[test]
    fn timeout_classification() {
        assert!(QualityError::Timeout { timeout_ms: 8000 }.is_timeout());
        assert!(!QualityError::Execution("boom".into()).is_timeout());
    }
}
