//! Inbound message dispatch.
//!
//! Turns each text frame into its side effects: a lifecycle event, a user
//! notification for domain events and an [`UpdateDescriptor`] for fan-out.
//! Bad frames never stop the stream; they are logged and discarded.

use std::sync::Arc;

use pulse_core::update::plain_string;
use pulse_core::{InboundKind, InboundMessage, UpdateDescriptor, UpdateKind};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::events::{ChannelEvent, EventEmitter};
use crate::fanout::UpdateRegistry;
use crate::notify::{NotificationLevel, NotificationSink, UserNotification, present};

/// What a frame turned out to be.
#[derive(Clone, Debug, PartialEq)]
pub enum Dispatch {
    /// `connected`: the server confirmed the session.
    Confirmed,
    /// `pong`: activity only.
    Pong,
    /// A domain event was notified and published.
    Domain(UpdateDescriptor),
    /// `error` frame from the server.
    ServerError(String),
    /// Well-formed but unrecognized `type`.
    Ignored(String),
    /// Not JSON, or no string `type`.
    Malformed,
}

/// Routes inbound frames to notifications, events and the registry.
pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
    registry: UpdateRegistry,
    events: Arc<EventEmitter>,
}

impl Dispatcher {
    /// Dispatcher over the given collaborators.
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        registry: UpdateRegistry,
        events: Arc<EventEmitter>,
    ) -> Self {
        Self {
            sink,
            registry,
            events,
        }
    }

    /// Handle one text frame.
    pub fn dispatch(&self, text: &str) -> Dispatch {
        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, len = text.len(), "discarding malformed frame");
                let _ = self.events.emit(ChannelEvent::Error {
                    message: e.to_string(),
                });
                return Dispatch::Malformed;
            }
        };
        let _ = self.events.emit(ChannelEvent::Message(message.clone()));

        match message.kind() {
            InboundKind::Connected => {
                info!("notification session confirmed");
                let _ = self.events.emit(ChannelEvent::Confirmed);
                Dispatch::Confirmed
            }
            InboundKind::Pong => Dispatch::Pong,
            InboundKind::Error => {
                let text = message
                    .error_text()
                    .unwrap_or_else(|| "server reported an error".to_string());
                warn!(error = %text, "server error frame");
                let _ = self.events.emit(ChannelEvent::Error {
                    message: text.clone(),
                });
                Dispatch::ServerError(text)
            }
            InboundKind::Domain(kind) => {
                let payload = message.data_or_null();
                present(self.sink.as_ref(), &domain_notification(kind, &payload));
                let descriptor = UpdateDescriptor::domain(kind, payload);
                let report = self.registry.publish(&descriptor);
                info!(
                    kind = %kind,
                    order_id = descriptor.order_id().as_deref().unwrap_or("-"),
                    delivered = report.delivered,
                    failed = report.failed,
                    "domain event dispatched"
                );
                Dispatch::Domain(descriptor)
            }
            InboundKind::Unknown => {
                debug!(message_type = %message.message_type, "ignoring unknown frame type");
                Dispatch::Ignored(message.message_type)
            }
        }
    }
}

/// User notification for a domain event.
///
/// Title comes from `data.title`, body from `data.alert` then
/// `data.message`, each falling back to generic text for the kind.
pub fn domain_notification(kind: UpdateKind, data: &Value) -> UserNotification {
    let (default_title, default_message, level) = match kind {
        UpdateKind::ResourceBorrowed => (
            "Power bank borrowed",
            "Your rental has started.",
            NotificationLevel::Info,
        ),
        _ => (
            "Thanks for returning!",
            "Your order has been closed.",
            NotificationLevel::Success,
        ),
    };

    let text = |key: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_owned)
    };

    UserNotification {
        title: text("title").unwrap_or_else(|| default_title.to_string()),
        message: text("alert")
            .or_else(|| text("message"))
            .unwrap_or_else(|| default_message.to_string()),
        level,
        tag: data
            .get("order_id")
            .and_then(plain_string)
            .map(|id| format!("{kind}-{id}")),
        data: data.clone(),
    }
}
