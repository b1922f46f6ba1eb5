//! Entity resolution errors.
//!
//! Per-record problems (missing names, malformed fields) are diagnostics,
//! not errors. Only internal invariant failures surface here, and those
//! abort the run. Sealing is enforced at the type level: sealing consumes
//! the resolver, so post-seal ingestion cannot be expressed.

use super::error_code::{self, RomaErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A logic defect, not bad input: duplicate id assignment, an entity
    /// losing its provenance, or coordinates leaving the valid envelope
    /// after a merge.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),
}

impl RomaErrorCode for ResolveError {
    fn error_code(&self) -> &'static str {
        error_code::INTEGRITY_VIOLATION
    }
}
