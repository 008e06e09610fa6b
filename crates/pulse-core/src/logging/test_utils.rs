//! In-memory capture of tracing events for assertions.
//!
//! [`capture_logs`] installs a thread-local subscriber, so it works with
//! `#[test]` and current-thread `#[tokio::test]` alike.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// A captured tracing event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// The log level.
    pub level: Level,
    /// The target module.
    pub target: String,
    /// The formatted message.
    pub message: String,
    /// Field key-value pairs.
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Value of a structured field, if recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Thread-safe store for captured events.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// All captured events.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Whether any event at `level` contains the message substring.
    pub fn has_event(&self, level: Level, message_contains: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(message_contains))
    }

    /// Whether any event contains the message substring.
    pub fn has_message(&self, message_contains: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.message.contains(message_contains))
    }

    /// Events carrying field `name` with exactly `value`.
    pub fn with_field(&self, name: &str, value: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.field(name) == Some(value))
            .cloned()
            .collect()
    }

    /// Count events at a specific level.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.events.lock().iter().filter(|e| e.level == level).count()
    }

    /// Clear all captured events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

struct CaptureLayer {
    logs: CapturedLogs,
}

struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let val = format!("{value:?}");
        if field.name() == "message" {
            self.message = val;
        } else {
            self.fields.push((field.name().to_owned(), val));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            value.clone_into(&mut self.message);
        } else {
            self.fields.push((field.name().to_owned(), value.to_owned()));
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.push((field.name().to_owned(), value.to_string()));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.push((field.name().to_owned(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.push((field.name().to_owned(), value.to_string()));
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor {
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut visitor);

        self.logs.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_owned(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Install a thread-local capturing subscriber.
///
/// Keep the returned guard alive for the duration of the test.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let layer = CaptureLayer { logs: logs.clone() };

    let subscriber = tracing_subscriber::registry()
        .with(layer)
        .with(LevelFilter::TRACE);

    let guard = subscriber.set_default();
    (logs, guard)
}
