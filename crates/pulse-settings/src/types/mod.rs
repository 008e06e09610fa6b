//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so partial JSON files fill missing fields from [`Default`].

mod channel;

pub use channel::*;

use pulse_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the Pulse client.
///
/// ```json
/// {
///   "channel": { "apiBaseUrl": "https://rent.example.com/api" },
///   "liveness": { "idleTimeoutMs": 600000 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PulseSettings {
    /// Settings schema version.
    pub version: String,
    /// Endpoint and channel plumbing.
    pub channel: ChannelSettings,
    /// Reconnect policy.
    pub reconnect: ReconnectSettings,
    /// Keep-alive and idle detection.
    pub liveness: LivenessSettings,
    /// Host environment signal handling.
    pub reachability: ReachabilitySettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for PulseSettings {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            channel: ChannelSettings::default(),
            reconnect: ReconnectSettings::default(),
            liveness: LivenessSettings::default(),
            reachability: ReachabilitySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl PulseSettings {
    /// Reject values the channel cannot run with.
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: &str) -> Result<()> {
            Err(SettingsError::InvalidValue(msg.to_string()))
        }

        if self.channel.api_base_url.trim().is_empty() {
            return invalid("channel.apiBaseUrl must not be empty");
        }
        if !self.channel.notification_path.starts_with('/') {
            return invalid("channel.notificationPath must start with '/'");
        }
        if self.channel.connect_timeout_ms == 0 {
            return invalid("channel.connectTimeoutMs must be > 0");
        }
        if self.channel.event_capacity == 0 {
            return invalid("channel.eventCapacity must be > 0");
        }
        if self.reconnect.base_delay_ms == 0 {
            return invalid("reconnect.baseDelayMs must be > 0");
        }
        if self.liveness.keepalive_interval_ms == 0 {
            return invalid("liveness.keepaliveIntervalMs must be > 0");
        }
        if self.liveness.idle_check_interval_ms == 0 {
            return invalid("liveness.idleCheckIntervalMs must be > 0");
        }
        if self.liveness.idle_timeout_ms == 0 {
            return invalid("liveness.idleTimeoutMs must be > 0");
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`trace`..`error`) or a full `EnvFilter` directive.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
