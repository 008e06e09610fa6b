//! Lifecycle events and their broadcast emitter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use pulse_core::InboundMessage;
use tokio::sync::broadcast;

use crate::connection::ConnectionState;

/// Default broadcast channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// Something that happened to the channel.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelEvent {
    /// The connection state changed.
    StateChanged {
        /// Previous state.
        from: ConnectionState,
        /// New state.
        to: ConnectionState,
    },
    /// The transport opened.
    Connected {
        /// Client-side id of this connection.
        connection_id: String,
    },
    /// The server confirmed the session with a `connected` frame.
    Confirmed,
    /// The connection closed.
    Disconnected {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
    /// Non-fatal error: transport failure, server `error` frame, bad payload.
    Error {
        /// Description.
        message: String,
    },
    /// A reconnect attempt was scheduled.
    ReconnectScheduled {
        /// 1-based attempt number.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// Reconnection gave up. Terminal until the next explicit connect.
    ReconnectFailed {
        /// Attempts spent.
        attempts: u32,
    },
    /// The idle watchdog closed the connection.
    IdleClosed {
        /// Inactivity observed at close time.
        idle_for: Duration,
    },
    /// A well-formed inbound frame, before dispatch side effects.
    Message(InboundMessage),
}

/// Broadcast-based event emitter.
///
/// Non-blocking: `emit` never awaits. Slow receivers lag rather than
/// blocking the connection task.
#[derive(Debug)]
pub struct EventEmitter {
    tx: broadcast::Sender<ChannelEvent>,
    emit_count: AtomicU64,
}

impl EventEmitter {
    /// Emitter with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Emitter with a custom capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            emit_count: AtomicU64::new(0),
        }
    }

    /// Emit to all receivers. Returns how many received it.
    pub fn emit(&self, event: ChannelEvent) -> usize {
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Receiver for events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.tx.subscribe()
    }

    /// Active receivers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Total events emitted.
    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_with_no_subscribers() {
        let emitter = EventEmitter::new();
        assert_eq!(emitter.emit(ChannelEvent::Confirmed), 0);
        assert_eq!(emitter.emit_count(), 1);
    }

    #[tokio::test]
    async fn multiple_subscribers() {
        let emitter = EventEmitter::new();
        let mut rx1 = emitter.subscribe();
        let mut rx2 = emitter.subscribe();
        assert_eq!(emitter.subscriber_count(), 2);

        let event = ChannelEvent::ReconnectFailed { attempts: 5 };
        assert_eq!(emitter.emit(event.clone()), 2);
        assert_eq!(rx1.recv().await.unwrap(), event);
        assert_eq!(rx2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn slow_receiver_lags() {
        let emitter = EventEmitter::with_capacity(2);
        let mut rx = emitter.subscribe();
        for _ in 0..3 {
            let _ = emitter.emit(ChannelEvent::Confirmed);
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let emitter = EventEmitter::with_capacity(0);
        let _rx = emitter.subscribe();
        assert_eq!(emitter.emit(ChannelEvent::Confirmed), 1);
    }
}
