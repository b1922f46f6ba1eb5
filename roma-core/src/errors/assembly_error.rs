//! Schema assembly errors.

use super::error_code::{self, RomaErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// Duplicate row id within an internally-built table: a logic
    /// defect, fatal.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),
}

impl RomaErrorCode for AssemblyError {
    fn error_code(&self) -> &'static str {
        error_code::INTEGRITY_VIOLATION
    }
}
