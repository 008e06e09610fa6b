//! Transport seam between the connection manager and the network.
//!
//! A [`Connector`] opens one connection and hands back a [`TransportLink`]:
//! a pair of channels owned by a background pump. The connection manager
//! never touches sockets directly, which keeps it testable against
//! [`crate::testing::FakeConnector`].

pub mod tungstenite;

use async_trait::async_trait;
use pulse_core::CloseFrame;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

pub use self::tungstenite::TungsteniteConnector;

/// Outbound channel depth per connection.
pub const OUTBOUND_CAPACITY: usize = 64;
/// Inbound channel depth per connection.
pub const INBOUND_CAPACITY: usize = 256;

/// Failure to establish a connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The attempt exceeded the connect timeout.
    #[error("connect timed out")]
    Timeout,
    /// Handshake or socket failure.
    #[error("connect failed: {0}")]
    Connect(String),
}

/// Something observed on an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Message(String),
    /// A protocol-level ping or pong. Counts as activity only.
    Heartbeat,
    /// A non-fatal error. A `Closed` event always follows a fatal one.
    Error(String),
    /// The connection is gone. Always the last event.
    Closed(CloseFrame),
}

/// A frame for the pump to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A text frame.
    Text(String),
    /// Start the close handshake.
    Close(CloseFrame),
}

/// Channel pair for one open connection.
#[derive(Debug)]
pub struct TransportLink {
    outbound: mpsc::Sender<Outbound>,
    inbound: mpsc::Receiver<TransportEvent>,
}

impl TransportLink {
    /// Wrap channels owned by a pump task.
    pub fn new(outbound: mpsc::Sender<Outbound>, inbound: mpsc::Receiver<TransportEvent>) -> Self {
        Self { outbound, inbound }
    }

    /// Queue a text frame. Fails when the pump is gone or backed up.
    pub fn send_text(&self, text: String) -> bool {
        self.outbound.try_send(Outbound::Text(text)).is_ok()
    }

    /// Queue a close frame. Best effort.
    pub fn close(&self, frame: CloseFrame) {
        let _ = self.outbound.try_send(Outbound::Close(frame));
    }

    /// Next event. A pump that vanished without reporting is an abnormal close.
    pub async fn next_event(&mut self) -> TransportEvent {
        self.inbound
            .recv()
            .await
            .unwrap_or_else(|| TransportEvent::Closed(CloseFrame::abnormal()))
    }
}

/// Opens connections to the notification endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open one connection to `url`. Must respect its own connect timeout.
    async fn connect(&self, url: &Url) -> Result<TransportLink, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::wire::close_code;

    #[tokio::test]
    async fn dropped_pump_reads_as_abnormal_close() {
        let (out_tx, _out_rx) = mpsc::channel(1);
        let (in_tx, in_rx) = mpsc::channel(1);
        let mut link = TransportLink::new(out_tx, in_rx);
        drop(in_tx);
        match link.next_event().await {
            TransportEvent::Closed(frame) => assert_eq!(frame.code, close_code::ABNORMAL),
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_text_reaches_pump() {
        let (out_tx, mut out_rx) = mpsc::channel(1);
        let (_in_tx, in_rx) = mpsc::channel(1);
        let link = TransportLink::new(out_tx, in_rx);
        assert!(link.send_text("ping".into()));
        assert_eq!(out_rx.recv().await, Some(Outbound::Text("ping".into())));
    }

    #[test]
    fn send_fails_once_pump_is_gone() {
        let (out_tx, out_rx) = mpsc::channel(1);
        let (_in_tx, in_rx) = mpsc::channel(1);
        let link = TransportLink::new(out_tx, in_rx);
        drop(out_rx);
        assert!(!link.send_text("ping".into()));
    }
}
