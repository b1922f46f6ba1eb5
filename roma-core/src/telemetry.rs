//! Tracing initialization for binaries and tests.

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the global tracing subscriber once.
///
/// Filter level comes from `ROMA_LOG` (falling back to `info`). Safe to
/// call from multiple tests; only the first call installs the subscriber.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("ROMA_LOG")
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
        tracing::debug!("telemetry initialized");
    });
}
