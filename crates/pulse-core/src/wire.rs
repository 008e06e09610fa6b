//! Wire vocabulary for the notification endpoint.
//!
//! Inbound frames are JSON text objects carrying a string `type` plus optional
//! `data` and `message` fields. Outbound traffic is limited to the literal
//! keep-alive text and close frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Result;
use crate::update::UpdateKind;

/// Keep-alive text frame sent to the server.
pub const PING_FRAME: &str = "ping";

/// Close reason used when the client shuts an idle connection.
pub const IDLE_TIMEOUT_REASON: &str = "idle_timeout";

/// Close reason used for an explicit client disconnect.
pub const CLIENT_DISCONNECT_REASON: &str = "client disconnect";

/// Close codes the channel reasons about.
pub mod close_code {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;
    /// Endpoint going away (server restart, page unload).
    pub const GOING_AWAY: u16 = 1001;
    /// Close frame carried no status code.
    pub const NO_STATUS: u16 = 1005;
    /// Connection dropped without a close frame.
    pub const ABNORMAL: u16 = 1006;
    /// Server refused the session (bad or expired token).
    pub const POLICY_VIOLATION: u16 = 1008;
    /// Server hit an internal error.
    pub const INTERNAL_ERROR: u16 = 1011;
}

/// Inbound JSON frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Discriminator such as `connected`, `pong` or a domain event name.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Human-readable text on `error` frames. Any JSON shape parses; only a
    /// string is read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

/// Classified inbound frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboundKind {
    /// Server confirmed the session.
    Connected,
    /// Reply to a keep-alive.
    Pong,
    /// Server-reported error.
    Error,
    /// Recognized domain event.
    Domain(UpdateKind),
    /// Anything else.
    Unknown,
}

impl InboundMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Classify by `type`.
    pub fn kind(&self) -> InboundKind {
        match self.message_type.as_str() {
            "connected" => InboundKind::Connected,
            "pong" => InboundKind::Pong,
            "error" => InboundKind::Error,
            other => UpdateKind::from_wire(other).map_or(InboundKind::Unknown, InboundKind::Domain),
        }
    }

    /// Payload, or `Null` when absent.
    pub fn data_or_null(&self) -> Value {
        self.data.clone().unwrap_or(Value::Null)
    }

    /// Error text for `error` frames: a string `message`, else a string
    /// `data.message`.
    pub fn error_text(&self) -> Option<String> {
        self.message
            .as_ref()
            .and_then(Value::as_str)
            .or_else(|| {
                self.data
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(Value::as_str)
            })
            .map(str::to_owned)
    }
}

/// Close code and reason observed on (or sent over) a connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseFrame {
    /// Close status code.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseFrame {
    /// Build a frame.
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Normal closure with the given reason.
    pub fn normal(reason: impl Into<String>) -> Self {
        Self::new(close_code::NORMAL, reason)
    }

    /// Frame the client sends when closing an idle connection.
    pub fn idle_timeout() -> Self {
        Self::normal(IDLE_TIMEOUT_REASON)
    }

    /// Synthetic frame for a connection lost without a close handshake.
    pub fn abnormal() -> Self {
        Self::new(close_code::ABNORMAL, "")
    }
}
