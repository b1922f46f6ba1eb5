//! Stable string codes for every error, for downstream reporting.

pub const CONFIG_ERROR: &str = "ROMA_CONFIG";
pub const INTEGRITY_VIOLATION: &str = "ROMA_INTEGRITY";
pub const NETWORK_ERROR: &str = "ROMA_NETWORK";
pub const STORAGE_ERROR: &str = "ROMA_STORAGE";
pub const CANCELLED: &str = "ROMA_CANCELLED";

/// Maps an error to its stable code.
pub trait RomaErrorCode {
    fn error_code(&self) -> &'static str;
}
