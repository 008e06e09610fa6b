//! Public handle to the notification channel.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use pulse_core::UpdateDescriptor;

use crate::config::{ClientConfig, EndpointConfig};
use crate::connection::{ActorParts, Command, ConnectionActor, ConnectionState};
use crate::endpoint::notification_url;
use crate::errors::{ClientError, Result};
use crate::events::{ChannelEvent, EventEmitter};
use crate::fanout::{Subscription, UpdateRegistry};
use crate::notify::{NotificationSink, request_permission};
use crate::reachability::ReachabilitySignal;
use crate::transport::Connector;

struct Shared {
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    events: Arc<EventEmitter>,
    registry: UpdateRegistry,
    sink: Arc<dyn NotificationSink>,
    endpoint: EndpointConfig,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a running notification channel.
///
/// Cheap to clone; all clones drive the same connection. The background
/// task stops on [`PulseClient::shutdown`] or once every clone is dropped.
#[derive(Clone)]
pub struct PulseClient {
    shared: Arc<Shared>,
}

impl PulseClient {
    /// Spawn the connection task. Must be called inside a tokio runtime.
    pub fn spawn(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let events = Arc::new(EventEmitter::with_capacity(config.event_capacity));
        let registry = UpdateRegistry::new();
        let cancel = CancellationToken::new();
        let endpoint = config.endpoint.clone();

        let actor = ConnectionActor::new(ActorParts {
            config,
            connector,
            sink: Arc::clone(&sink),
            registry: registry.clone(),
            events: Arc::clone(&events),
            state_tx,
            commands: commands_rx,
            cancel: cancel.clone(),
        });
        let task = tokio::spawn(actor.run());

        Self {
            shared: Arc::new(Shared {
                commands: commands_tx,
                state_rx,
                events,
                registry,
                sink,
                endpoint,
                cancel,
                task: Mutex::new(Some(task)),
            }),
        }
    }

    /// Open the channel with `token`. No-op while connecting or open.
    ///
    /// Returns once the request is queued; the handshake runs in the
    /// background. Fails fast when the endpoint cannot be derived.
    pub fn connect(&self, token: impl Into<String>) -> Result<()> {
        let token = SecretString::from(token.into());
        let _ = notification_url(&self.shared.endpoint, &token)?;
        self.command(Command::Connect(token))
    }

    /// Close the channel, forget the token and cancel any pending reconnect.
    /// Idempotent.
    pub fn disconnect(&self) {
        if self.command(Command::Disconnect).is_err() {
            debug!("disconnect after shutdown");
        }
    }

    /// Send a JSON frame. Fails with [`ClientError::NotConnected`] unless
    /// open; a channel closed for inactivity starts reconnecting.
    pub async fn send(&self, message: &Value) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Send {
            text: message.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| ClientError::ShutDown)?
    }

    /// Register an update consumer.
    pub fn on_data_update<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&UpdateDescriptor) + Send + Sync + 'static,
    {
        self.shared.registry.subscribe(callback)
    }

    /// The fan-out registry, for consumers that only need to subscribe.
    pub fn registry(&self) -> &UpdateRegistry {
        &self.shared.registry
    }

    /// Ask the host for notification permission. Returns whether granted.
    pub async fn request_notification_permission(&self) -> bool {
        request_permission(self.shared.sink.as_ref()).await
    }

    /// Feed one host reachability signal.
    pub fn notify_reachability(&self, signal: ReachabilitySignal) -> Result<()> {
        self.command(Command::Reachability(signal))
    }

    /// Forward every signal from `signals` until it ends or the client shuts down.
    pub fn attach_reachability<S>(&self, signals: S) -> JoinHandle<()>
    where
        S: Stream<Item = ReachabilitySignal> + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            let mut signals = Box::pin(signals);
            while let Some(signal) = signals.next().await {
                if client.notify_reachability(signal).is_err() {
                    break;
                }
            }
        })
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_rx.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_rx.clone()
    }

    /// Lifecycle events emitted after this call.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.shared.events.subscribe()
    }

    /// Wait until the channel is open.
    ///
    /// Fails with [`ClientError::Closed`] if reconnection gives up while
    /// waiting, and with [`ClientError::Timeout`] when `timeout` elapses.
    pub async fn wait_for_open(&self, timeout: Duration) -> Result<()> {
        let mut state_rx = self.shared.state_rx.clone();
        let mut events = self.shared.events.subscribe();
        let wait = async move {
            loop {
                if *state_rx.borrow_and_update() == ConnectionState::Open {
                    return Ok(());
                }
                tokio::select! {
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            return Err(ClientError::ShutDown);
                        }
                    }
                    event = events.recv() => match event {
                        Ok(ChannelEvent::ReconnectFailed { .. }) => return Err(ClientError::Closed),
                        Err(RecvError::Closed) => return Err(ClientError::ShutDown),
                        Ok(_) | Err(RecvError::Lagged(_)) => {}
                    },
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
    }

    /// Stop the connection task and wait for it to finish.
    pub async fn shutdown(&self) {
        self.shared.cancel.cancel();
        let task = self.shared.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "connection task ended abnormally");
            }
        }
    }

    fn command(&self, cmd: Command) -> Result<()> {
        self.shared
            .commands
            .send(cmd)
            .map_err(|_| ClientError::ShutDown)
    }
}

impl std::fmt::Debug for PulseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseClient")
            .field("state", &self.state())
            .field("subscribers", &self.shared.registry.subscriber_count())
            .field("event_receivers", &self.shared.events.subscriber_count())
            .field("events_emitted", &self.shared.events.emit_count())
            .finish_non_exhaustive()
    }
}
