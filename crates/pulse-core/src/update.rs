//! Update descriptors fanned out to application consumers.
//!
//! A descriptor tells consumers *why* dependent state may be stale. Domain
//! descriptors come from server pushes; host descriptors come from the
//! environment (page visible again, network back) so consumers can refresh
//! eagerly instead of waiting for the next push.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cause of an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateKind {
    /// A borrowed resource was returned.
    ResourceReturned,
    /// A resource was borrowed.
    ResourceBorrowed,
    /// The host page became visible or focused again.
    PageVisible,
    /// The host network came back online.
    NetworkRestored,
}

impl UpdateKind {
    /// Canonical kebab-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResourceReturned => "resource-returned",
            Self::ResourceBorrowed => "resource-borrowed",
            Self::PageVisible => "page-visible",
            Self::NetworkRestored => "network-restored",
        }
    }

    /// Map a wire `type` to a domain event kind.
    ///
    /// Accepts the canonical names, their snake-case forms and the legacy
    /// power bank names the rental backend emits. Host kinds are never
    /// produced from the wire.
    pub fn from_wire(message_type: &str) -> Option<Self> {
        match message_type {
            "resource-returned" | "resource_returned" | "powerbank_returned" => {
                Some(Self::ResourceReturned)
            }
            "resource-borrowed" | "resource_borrowed" | "powerbank_borrowed" => {
                Some(Self::ResourceBorrowed)
            }
            _ => None,
        }
    }

    /// Whether this kind originates from a server push.
    pub fn is_domain_event(self) -> bool {
        matches!(self, Self::ResourceReturned | Self::ResourceBorrowed)
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient value passed through fan-out. Never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDescriptor {
    /// What caused the update.
    pub kind: UpdateKind,
    /// Event-specific data (ids, timestamps). `Null` for host signals.
    pub payload: Value,
    /// Short machine-readable reason for host signals (`user_returned`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the client observed the cause.
    pub received_at: DateTime<Utc>,
}

impl UpdateDescriptor {
    /// Descriptor for a server-pushed domain event.
    pub fn domain(kind: UpdateKind, payload: Value) -> Self {
        Self {
            kind,
            payload,
            reason: None,
            received_at: Utc::now(),
        }
    }

    /// Descriptor for a host reachability signal.
    pub fn host(kind: UpdateKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            payload: Value::Null,
            reason: Some(reason.into()),
            received_at: Utc::now(),
        }
    }

    /// Station the event refers to, if the payload carries one.
    pub fn station_id(&self) -> Option<String> {
        self.payload.get("station_id").and_then(plain_string)
    }

    /// Order the event refers to, if the payload carries one.
    pub fn order_id(&self) -> Option<String> {
        self.payload.get("order_id").and_then(plain_string)
    }
}

/// Render a scalar JSON id (string or number) as text.
pub fn plain_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
