//! Shared parameter parsing for validators.
//!
//! Every helper returns `Err(CheckResult)` with a specific diagnostic so the
//! calling validator can bail out through `try_check!` without panicking.

use datapulse_core::{CheckConfig, CheckResult};

/// Unwrap a helper result or return its diagnostic `CheckResult`.
macro_rules! try_check {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(result) => return result,
        }
    };
}
pub(crate) use try_check;

pub(crate) fn required_column(check: &CheckConfig) -> Result<&str, CheckResult> {
    check.column.as_deref().ok_or_else(|| {
        CheckResult::error(format!(
            "column parameter is required for {} check",
            check.check_type
        ))
    })
}

pub(crate) fn required_param<'a>(
    check: &'a CheckConfig,
    key: &str,
) -> Result<&'a str, CheckResult> {
    check
        .param(key)
        .ok_or_else(|| CheckResult::error(format!("{key} parameter is required")))
}

/// Parse an optional numeric parameter, falling back to `default` when
/// absent. Absent lower/upper bounds become ±infinity at the call sites.
pub(crate) fn f64_param(
    check: &CheckConfig,
    key: &str,
    default: f64,
) -> Result<f64, CheckResult> {
    match check.param(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| CheckResult::error(format!("{key} parameter '{raw}' is not numeric"))),
    }
}

pub(crate) fn i64_param(
    check: &CheckConfig,
    key: &str,
    default: i64,
) -> Result<i64, CheckResult> {
    match check.param(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| CheckResult::error(format!("{key} parameter '{raw}' is not an integer"))),
    }
}

pub(crate) fn opt_i64_param(check: &CheckConfig, key: &str) -> Result<Option<i64>, CheckResult> {
    match check.param(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| CheckResult::error(format!("{key} parameter '{raw}' is not an integer"))),
    }
}
