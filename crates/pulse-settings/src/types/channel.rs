//! Channel, reconnect, liveness and reachability settings.

use pulse_core::retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_RETRIES};
use pulse_core::wire::close_code;
use serde::{Deserialize, Serialize};

/// Endpoint and channel plumbing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSettings {
    /// Application API base URL, absolute (`https://host/api`) or
    /// origin-relative (`/api`).
    pub api_base_url: String,
    /// Origin of the hosting page. Required when `api_base_url` is relative;
    /// its scheme decides between `ws` and `wss`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_origin: Option<String>,
    /// Path of the notification endpoint.
    pub notification_path: String,
    /// Upper bound on a single connection attempt in milliseconds.
    pub connect_timeout_ms: u64,
    /// Buffer size of the lifecycle event broadcast.
    pub event_capacity: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            page_origin: None,
            notification_path: pulse_core::constants::NOTIFICATION_PATH.to_string(),
            connect_timeout_ms: 10_000,
            event_capacity: 256,
        }
    }
}

/// Reconnect policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectSettings {
    /// Maximum consecutive reconnect attempts.
    pub max_retries: u32,
    /// Linear backoff base in milliseconds.
    pub base_delay_ms: u64,
    /// Close codes after which the client gives up instead of retrying.
    pub terminal_close_codes: Vec<u16>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            terminal_close_codes: vec![close_code::POLICY_VIOLATION],
        }
    }
}

/// Keep-alive and idle detection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LivenessSettings {
    /// Keep-alive period in milliseconds.
    pub keepalive_interval_ms: u64,
    /// How often inactivity is checked, in milliseconds.
    pub idle_check_interval_ms: u64,
    /// Inactivity after which the connection is closed, in milliseconds.
    pub idle_timeout_ms: u64,
}

impl Default for LivenessSettings {
    fn default() -> Self {
        Self {
            keepalive_interval_ms: 30_000,
            idle_check_interval_ms: 10_000,
            idle_timeout_ms: 3_600_000,
        }
    }
}

/// Host environment signal handling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReachabilitySettings {
    /// Delay between the host reporting "online" and the reconnect attempt.
    pub online_settle_ms: u64,
}

impl Default for ReachabilitySettings {
    fn default() -> Self {
        Self {
            online_settle_ms: 1000,
        }
    }
}
