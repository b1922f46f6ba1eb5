//! Pipeline-level error aggregation.

use super::error_code::{self, RomaErrorCode};
use super::{AssemblyError, ConfigError, NetworkError, ResolveError, StorageError};

/// Errors that can occur during a pipeline run.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Pipeline cancelled")]
    Cancelled,
}

impl RomaErrorCode for PipelineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Resolve(e) => e.error_code(),
            Self::Assembly(e) => e.error_code(),
            Self::Network(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}
