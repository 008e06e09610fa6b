//! Runtime configuration for the client, derived from [`PulseSettings`].
//!
//! Settings carry millisecond integers for JSON friendliness; the client
//! works in [`Duration`]s.

use std::time::Duration;

use pulse_core::RetryBudget;
use pulse_settings::PulseSettings;

/// Where and how to reach the notification endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Application API base URL, absolute or origin-relative.
    pub api_base_url: String,
    /// Origin of the hosting page (`https://app.example.com`).
    pub page_origin: Option<String>,
    /// Endpoint path appended to the derived host.
    pub notification_path: String,
    /// Upper bound on one connection attempt.
    pub connect_timeout: Duration,
}

/// Reconnect policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Maximum consecutive attempts after an unexpected close.
    pub max_retries: u32,
    /// Linear backoff base.
    pub base_delay: Duration,
    /// Close codes that end the session instead of retrying.
    pub terminal_close_codes: Vec<u16>,
}

impl ReconnectConfig {
    /// Fresh retry budget for this policy.
    pub fn budget(&self) -> RetryBudget {
        RetryBudget::new(self.max_retries, self.base_delay)
    }

    /// Whether a close with `code` must not be retried.
    pub fn is_terminal(&self, code: u16) -> bool {
        self.terminal_close_codes.contains(&code)
    }
}

/// Keep-alive and idle detection timings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Keep-alive period.
    pub keepalive_interval: Duration,
    /// Idle check period.
    pub idle_check_interval: Duration,
    /// Inactivity threshold.
    pub idle_timeout: Duration,
}

/// Complete client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Endpoint derivation.
    pub endpoint: EndpointConfig,
    /// Reconnect policy.
    pub reconnect: ReconnectConfig,
    /// Liveness timings.
    pub liveness: LivenessConfig,
    /// Delay between an "online" signal and the reconnect it triggers.
    pub online_settle: Duration,
    /// Lifecycle event buffer size.
    pub event_capacity: usize,
}

impl ClientConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &PulseSettings) -> Self {
        let ms = Duration::from_millis;
        Self {
            endpoint: EndpointConfig {
                api_base_url: settings.channel.api_base_url.clone(),
                page_origin: settings.channel.page_origin.clone(),
                notification_path: settings.channel.notification_path.clone(),
                connect_timeout: ms(settings.channel.connect_timeout_ms),
            },
            reconnect: ReconnectConfig {
                max_retries: settings.reconnect.max_retries,
                base_delay: ms(settings.reconnect.base_delay_ms),
                terminal_close_codes: settings.reconnect.terminal_close_codes.clone(),
            },
            liveness: LivenessConfig {
                keepalive_interval: ms(settings.liveness.keepalive_interval_ms),
                idle_check_interval: ms(settings.liveness.idle_check_interval_ms),
                idle_timeout: ms(settings.liveness.idle_timeout_ms),
            },
            online_settle: ms(settings.reachability.online_settle_ms),
            event_capacity: settings.channel.event_capacity,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_settings(&PulseSettings::default())
    }
}
