//! Structured logging with `tracing`.
//!
//! - [`init_subscriber`] installs the global stderr subscriber
//! - [`LogFormat`] picks human-readable or JSON lines
//! - [`capture_logs`] records events in memory for test assertions
//!
//! Log context (connection id, close code, attempt) travels as structured
//! fields on each event rather than being formatted into the message.

pub mod test_utils;

use serde::{Deserialize, Serialize};

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

/// Output format for the stderr subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Initialize the global tracing subscriber with compact stderr output.
///
/// Call once at application startup. Subsequent calls are no-ops.
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_subscriber(level: &str) {
    init_subscriber_with_format(level, LogFormat::Compact);
}

/// Initialize the global tracing subscriber with the given format.
pub fn init_subscriber_with_format(level: &str, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Compact => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .compact();
            // set_global_default is a no-op if already set
            let _ = subscriber.try_init();
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .json();
            let _ = subscriber.try_init();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
