//! Storage/export errors.

use super::error_code::{self, RomaErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {message}")]
    SqliteError { message: String },

    #[error("I/O error writing {path}: {message}")]
    IoError { path: String, message: String },

    #[error("Foreign key check failed after export: {0} violations")]
    ForeignKeyCheckFailed(usize),
}

impl RomaErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        error_code::STORAGE_ERROR
    }
}
