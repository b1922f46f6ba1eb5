//! Travel network builder errors.

use super::error_code::{self, RomaErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// A promoted edge referencing a location outside the assembled
    /// table: a logic defect, fatal.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),
}

impl RomaErrorCode for NetworkError {
    fn error_code(&self) -> &'static str {
        error_code::NETWORK_ERROR
    }
}
