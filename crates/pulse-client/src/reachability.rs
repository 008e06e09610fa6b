//! Host environment reachability signals.
//!
//! The host (browser shell, desktop wrapper, CLI) translates its own
//! lifecycle notifications into [`ReachabilitySignal`]s. Signals meaning
//! "the user or the network is back" revive an idle or dropped connection
//! and tell consumers to refresh; the others are logged only.

use std::fmt;
use std::str::FromStr;

use pulse_core::UpdateKind;
use thiserror::Error;

/// Reason attached to `page-visible` descriptors.
pub const USER_RETURNED: &str = "user_returned";
/// Reason attached to `network-restored` descriptors.
pub const CONNECTION_ONLINE: &str = "connection_online";

/// A host lifecycle notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReachabilitySignal {
    /// Page went from hidden to visible.
    Visible,
    /// Page was hidden.
    Hidden,
    /// Page restored from a suspended/back-forward cache.
    Restored,
    /// Window gained focus.
    Focus,
    /// Network came online.
    Online,
    /// Network went offline.
    Offline,
}

/// How the connection task reacts to a signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reaction {
    /// Refresh activity, reconnect if needed, publish now.
    Reachable {
        /// Descriptor kind to publish.
        kind: UpdateKind,
        /// Descriptor reason.
        reason: &'static str,
    },
    /// Wait for the settle delay, then react as `Reachable`.
    AfterSettle {
        /// Descriptor kind to publish.
        kind: UpdateKind,
        /// Descriptor reason.
        reason: &'static str,
    },
    /// Log only.
    Ignore,
}

impl ReachabilitySignal {
    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::Restored => "restored",
            Self::Focus => "focus",
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    /// The reaction this signal calls for.
    pub fn reaction(self) -> Reaction {
        match self {
            Self::Visible | Self::Restored | Self::Focus => Reaction::Reachable {
                kind: UpdateKind::PageVisible,
                reason: USER_RETURNED,
            },
            Self::Online => Reaction::AfterSettle {
                kind: UpdateKind::NetworkRestored,
                reason: CONNECTION_ONLINE,
            },
            Self::Hidden | Self::Offline => Reaction::Ignore,
        }
    }
}

impl fmt::Display for ReachabilitySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized signal name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown reachability signal: {0}")]
pub struct UnknownSignal(pub String);

impl FromStr for ReachabilitySignal {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visible" | "visibilitychange" => Ok(Self::Visible),
            "hidden" => Ok(Self::Hidden),
            "restored" | "pageshow" => Ok(Self::Restored),
            "focus" => Ok(Self::Focus),
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            other => Err(UnknownSignal(other.to_string())),
        }
    }
}
