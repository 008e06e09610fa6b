//! User-facing notifications.
//!
//! The channel raises two kinds of user notifications: domain events
//! (a resource was returned) and the terminal "connection lost" failure.
//! Rendering is the host's business, reached through [`NotificationSink`].
//! Host-level (OS/browser) notifications are additionally shown only when
//! the host reports that permission was granted earlier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Visual weight of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// Positive outcome.
    Success,
    /// Neutral information.
    Info,
    /// Needs attention.
    Warning,
    /// Something failed.
    Error,
}

/// A notification for the user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserNotification {
    /// Headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Visual weight.
    pub level: NotificationLevel,
    /// Replacement tag: a newer notification with the same tag supersedes
    /// the older one at host level.
    pub tag: Option<String>,
    /// Event payload for click-through handling.
    pub data: Value,
}

impl UserNotification {
    /// Terminal reconnect failure.
    pub fn connection_lost() -> Self {
        Self {
            title: "Connection lost".to_string(),
            message: "Real-time updates are unavailable. Reload to try again.".to_string(),
            level: NotificationLevel::Error,
            tag: Some("connection-lost".to_string()),
            data: Value::Null,
        }
    }
}

/// Host permission for OS-level notifications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Never asked.
    #[default]
    Default,
    /// Granted.
    Granted,
    /// Refused.
    Denied,
}

/// Where notifications are rendered.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Show an in-app notification.
    fn show(&self, notification: &UserNotification);

    /// Current host-level permission.
    fn host_permission(&self) -> Permission {
        Permission::Denied
    }

    /// Ask the host for permission. May prompt the user.
    async fn request_host_permission(&self) -> Permission {
        self.host_permission()
    }

    /// Show a host-level notification. Only called when permission is granted.
    fn show_host(&self, _notification: &UserNotification) {}
}

/// Show `notification` in-app, and at host level when already permitted.
pub fn present(sink: &dyn NotificationSink, notification: &UserNotification) {
    sink.show(notification);
    if sink.host_permission() == Permission::Granted {
        sink.show_host(notification);
    } else {
        debug!(title = %notification.title, "host notification skipped, permission not granted");
    }
}

/// Request host permission. Returns whether it is granted.
pub async fn request_permission(sink: &dyn NotificationSink) -> bool {
    match sink.host_permission() {
        Permission::Granted => true,
        Permission::Denied => {
            debug!("host notification permission previously denied");
            false
        }
        Permission::Default => {
            let granted = sink.request_host_permission().await == Permission::Granted;
            info!(granted, "host notification permission requested");
            granted
        }
    }
}

/// Sink that writes notifications to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    fn show(&self, n: &UserNotification) {
        match n.level {
            NotificationLevel::Success | NotificationLevel::Info => {
                info!(title = %n.title, body = %n.message, tag = ?n.tag, "notification");
            }
            NotificationLevel::Warning => {
                warn!(title = %n.title, body = %n.message, tag = ?n.tag, "notification");
            }
            NotificationLevel::Error => {
                error!(title = %n.title, body = %n.message, tag = ?n.tag, "notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    fn note() -> UserNotification {
        UserNotification {
            title: "Thanks".into(),
            message: "Order closed".into(),
            level: NotificationLevel::Success,
            tag: Some("resource-returned-1".into()),
            data: Value::Null,
        }
    }

    #[test]
    fn present_without_permission_is_in_app_only() {
        let sink = RecordingSink::new();
        present(&sink, &note());
        assert_eq!(sink.shown().len(), 1);
        assert!(sink.host_shown().is_empty());
    }

    #[test]
    fn present_with_permission_also_shows_host() {
        let sink = RecordingSink::with_permission(Permission::Granted);
        present(&sink, &note());
        assert_eq!(sink.shown().len(), 1);
        assert_eq!(sink.host_shown()[0].tag.as_deref(), Some("resource-returned-1"));
    }

    #[tokio::test]
    async fn request_permission_prompts_only_when_undecided() {
        let sink = RecordingSink::new().grant_on_request();
        assert!(request_permission(&sink).await);
        assert_eq!(sink.permission_requests(), 1);
        assert!(request_permission(&sink).await);
        assert_eq!(sink.permission_requests(), 1);

        let denied = RecordingSink::with_permission(Permission::Denied).grant_on_request();
        assert!(!request_permission(&denied).await);
        assert_eq!(denied.permission_requests(), 0);
    }

    #[test]
    fn tracing_sink_logs_by_level() {
        let (logs, _guard) = pulse_core::logging::capture_logs();
        TracingSink.show(&UserNotification::connection_lost());
        assert!(logs.has_event(tracing::Level::ERROR, "notification"));
        assert_eq!(logs.with_field("title", "Connection lost").len(), 1);
        assert_eq!(
            logs.with_field("body", &UserNotification::connection_lost().message)
                .len(),
            1
        );
    }

    #[test]
    fn default_trait_permission_is_denied() {
        assert_eq!(TracingSink.host_permission(), Permission::Denied);
    }
}
