//! Structured results for best-effort side effects.

use std::fmt::Display;

/// Result of a step whose failure is absorbed rather than propagated.
///
/// Mirror writes and push server registration report through this type so
/// callers (and tests) can see what was swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    Ok,
    /// The step was not attempted (e.g. nothing to do).
    Skipped,
    Warn(String),
}

impl BestEffort {
    /// Convert a result into an outcome, logging the absorbed error.
    pub fn absorb<T, E: Display>(context: &str, result: Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(error) => {
                tracing::warn!("{context}: {error}");
                Self::Warn(error.to_string())
            }
        }
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub const fn is_warn(&self) -> bool {
        matches!(self, Self::Warn(_))
    }
}
