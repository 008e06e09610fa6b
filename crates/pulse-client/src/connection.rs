//! Connection manager.
//!
//! A single tokio task owns the connection and everything tied to it: the
//! auth token, the retry budget, the liveness timers, the reconnect and
//! settle deadlines and the in-flight connect attempt. It multiplexes
//! commands, transport events and timers with `tokio::select!`, then runs
//! the matching handler with exclusive access to its state.
//!
//! ```text
//! Idle ──connect──▶ Connecting ──open──▶ Open ──disconnect/idle──▶ Closing ──▶ Closed
//!                        ▲                 │                                   │
//!                        │             unexpected close ──────────────────────▶│
//!                        └──────────── reconnect timer / reachability ◀────────┘
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use pulse_core::wire::{CLIENT_DISCONNECT_REASON, PING_FRAME};
use pulse_core::{CloseFrame, RetryBudget, UpdateDescriptor, UpdateKind};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::endpoint::{notification_url, redacted};
use crate::errors::ClientError;
use crate::events::{ChannelEvent, EventEmitter};
use crate::fanout::UpdateRegistry;
use crate::liveness::{LivenessMonitor, LivenessTick};
use crate::notify::{NotificationSink, UserNotification, present};
use crate::reachability::{CONNECTION_ONLINE, Reaction, ReachabilitySignal};
use crate::transport::{Connector, TransportError, TransportEvent, TransportLink};

/// Lifecycle state of the connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Never connected.
    #[default]
    Idle,
    /// Handshake in flight.
    Connecting,
    /// Transport open.
    Open,
    /// Client-initiated close in progress.
    Closing,
    /// No transport. A reconnect may be scheduled.
    Closed,
}

impl ConnectionState {
    /// `Connecting` or `Open`: a connect request is a no-op.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requests from [`crate::PulseClient`] handles.
pub(crate) enum Command {
    Connect(SecretString),
    Disconnect,
    Send {
        text: String,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    Reachability(ReachabilitySignal),
}

type PendingConnect = BoxFuture<'static, Result<TransportLink, TransportError>>;

/// What woke the task.
enum Wake {
    Cancelled,
    Command(Option<Command>),
    Connected(Result<TransportLink, TransportError>),
    Transport(TransportEvent),
    Liveness(LivenessTick),
    ReconnectDue,
    SettleDue,
}

/// Collaborators handed to the task at spawn time.
pub(crate) struct ActorParts {
    pub config: ClientConfig,
    pub connector: Arc<dyn Connector>,
    pub sink: Arc<dyn NotificationSink>,
    pub registry: UpdateRegistry,
    pub events: Arc<EventEmitter>,
    pub state_tx: watch::Sender<ConnectionState>,
    pub commands: mpsc::UnboundedReceiver<Command>,
    pub cancel: CancellationToken,
}

pub(crate) struct ConnectionActor {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    registry: UpdateRegistry,
    events: Arc<EventEmitter>,
    sink: Arc<dyn NotificationSink>,
    state_tx: watch::Sender<ConnectionState>,
    commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,

    token: Option<SecretString>,
    should_reconnect: bool,
    retry: RetryBudget,
    gave_up: bool,
    pending: Option<PendingConnect>,
    link: Option<TransportLink>,
    connection_id: Option<String>,
    liveness: LivenessMonitor,
    reconnect_at: Option<Instant>,
    settle_at: Option<Instant>,
}

impl ConnectionActor {
    pub(crate) fn new(parts: ActorParts) -> Self {
        let ActorParts {
            config,
            connector,
            sink,
            registry,
            events,
            state_tx,
            commands,
            cancel,
        } = parts;
        let dispatcher = Dispatcher::new(Arc::clone(&sink), registry.clone(), Arc::clone(&events));
        Self {
            retry: config.reconnect.budget(),
            liveness: LivenessMonitor::new(config.liveness),
            config,
            connector,
            dispatcher,
            registry,
            events,
            sink,
            state_tx,
            commands,
            cancel,
            token: None,
            should_reconnect: false,
            gave_up: false,
            pending: None,
            link: None,
            connection_id: None,
            reconnect_at: None,
            settle_at: None,
        }
    }

    /// Run until cancelled or every client handle is dropped.
    #[instrument(name = "pulse_connection", skip_all)]
    pub(crate) async fn run(mut self) {
        debug!("connection task started");
        loop {
            let wake = tokio::select! {
                biased;
                () = self.cancel.cancelled() => Wake::Cancelled,
                cmd = self.commands.recv() => Wake::Command(cmd),
                result = poll_pending(&mut self.pending) => Wake::Connected(result),
                event = next_transport_event(&mut self.link) => Wake::Transport(event),
                tick = self.liveness.tick() => Wake::Liveness(tick),
                () = sleep_until_deadline(self.reconnect_at) => Wake::ReconnectDue,
                () = sleep_until_deadline(self.settle_at) => Wake::SettleDue,
            };

            match wake {
                Wake::Cancelled | Wake::Command(None) => {
                    self.disconnect();
                    break;
                }
                Wake::Command(Some(cmd)) => self.on_command(cmd),
                Wake::Connected(result) => {
                    self.pending = None;
                    self.on_connect_result(result);
                }
                Wake::Transport(event) => self.on_transport_event(event),
                Wake::Liveness(tick) => self.on_liveness_tick(tick),
                Wake::ReconnectDue => {
                    self.reconnect_at = None;
                    if self.should_reconnect && !self.state().is_active() {
                        self.begin_connect();
                    }
                }
                Wake::SettleDue => {
                    self.settle_at = None;
                    self.on_reachable(UpdateKind::NetworkRestored, CONNECTION_ONLINE);
                }
            }
        }
        debug!("connection task stopped");
    }

    // ── Commands ────────────────────────────────────────────────────

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect(token) => self.connect(token),
            Command::Disconnect => self.disconnect(),
            Command::Send { text, reply } => {
                let result = self.send(text);
                let _ = reply.send(result);
            }
            Command::Reachability(signal) => self.on_reachability(signal),
        }
    }

    fn connect(&mut self, token: SecretString) {
        let state = self.state();
        if state.is_active() {
            debug!(%state, "connect ignored, connection already active");
            return;
        }
        if token.expose_secret().is_empty() {
            warn!("connecting with an empty token");
        }
        self.token = Some(token);
        self.should_reconnect = true;
        self.gave_up = false;
        self.retry.reset();
        self.reconnect_at = None;
        self.begin_connect();
    }

    fn disconnect(&mut self) {
        self.should_reconnect = false;
        self.token = None;
        self.reconnect_at = None;
        self.settle_at = None;
        self.liveness.stop();
        if self.pending.take().is_some() {
            debug!("abandoning in-flight connect attempt");
        }

        let closing_link = self.link.take();
        if let Some(link) = &closing_link {
            link.close(CloseFrame::normal(CLIENT_DISCONNECT_REASON));
            self.set_state(ConnectionState::Closing);
        }
        match self.state() {
            ConnectionState::Idle | ConnectionState::Closed => {}
            _ => self.set_state(ConnectionState::Closed),
        }
        if closing_link.is_some() {
            info!(connection_id = self.connection_id.as_deref().unwrap_or("-"), "disconnected");
            let _ = self.events.emit(ChannelEvent::Disconnected {
                code: pulse_core::wire::close_code::NORMAL,
                reason: CLIENT_DISCONNECT_REASON.to_string(),
            });
        }
        self.connection_id = None;
    }

    fn send(&mut self, text: String) -> Result<(), ClientError> {
        if self.state() == ConnectionState::Open {
            if let Some(link) = &self.link {
                if link.send_text(text) {
                    return Ok(());
                }
                warn!("outbound frame dropped, transport not accepting");
                return Err(ClientError::NotConnected);
            }
        }
        debug!(state = %self.state(), "send while not open");
        self.reconnect_if_needed("send");
        Err(ClientError::NotConnected)
    }

    fn on_reachability(&mut self, signal: ReachabilitySignal) {
        match signal.reaction() {
            Reaction::Reachable { kind, reason } => {
                info!(%signal, "host reachable");
                self.on_reachable(kind, reason);
            }
            Reaction::AfterSettle { .. } => {
                info!(%signal, settle_ms = millis(self.config.online_settle), "host online, settling");
                self.settle_at = Some(Instant::now() + self.config.online_settle);
            }
            Reaction::Ignore => info!(%signal, "host signal noted"),
        }
    }

    fn on_reachable(&mut self, kind: UpdateKind, reason: &'static str) {
        self.liveness.record_activity();
        self.reconnect_if_needed(reason);
        let report = self.registry.publish(&UpdateDescriptor::host(kind, reason));
        debug!(kind = %kind, delivered = report.delivered, failed = report.failed, "host update published");
    }

    fn reconnect_if_needed(&mut self, trigger: &str) {
        if self.state().is_active() {
            return;
        }
        if !self.should_reconnect || self.token.is_none() {
            trace!(trigger, "no session to revive");
            return;
        }
        if self.gave_up {
            debug!(trigger, "reconnect skipped, retries exhausted");
            return;
        }
        info!(trigger, "reconnecting on demand");
        self.retry.reset();
        self.reconnect_at = None;
        self.begin_connect();
    }

    // ── Connection lifecycle ────────────────────────────────────────

    fn begin_connect(&mut self) {
        let Some(token) = &self.token else {
            return;
        };
        let url = match notification_url(&self.config.endpoint, token) {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "cannot derive notification endpoint");
                let _ = self.events.emit(ChannelEvent::Error {
                    message: e.to_string(),
                });
                self.should_reconnect = false;
                self.set_state(ConnectionState::Closed);
                return;
            }
        };

        info!(url = %redacted(&url), attempt = self.retry.attempts(), "connecting");
        self.set_state(ConnectionState::Connecting);
        let connector = Arc::clone(&self.connector);
        self.pending = Some(Box::pin(async move { connector.connect(&url).await }));
    }

    fn on_connect_result(&mut self, result: Result<TransportLink, TransportError>) {
        match result {
            Ok(link) => {
                let connection_id = Uuid::now_v7().to_string();
                info!(%connection_id, "notification channel open");
                self.link = Some(link);
                self.retry.reset();
                self.liveness.start();
                self.set_state(ConnectionState::Open);
                self.connection_id = Some(connection_id.clone());
                let _ = self.events.emit(ChannelEvent::Connected { connection_id });
            }
            Err(e) => {
                warn!(error = %e, "connect attempt failed");
                let _ = self.events.emit(ChannelEvent::Error {
                    message: e.to_string(),
                });
                self.on_unexpected_close(&CloseFrame::abnormal());
            }
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(text) => {
                self.liveness.record_activity();
                let _ = self.dispatcher.dispatch(&text);
            }
            TransportEvent::Heartbeat => self.liveness.record_activity(),
            TransportEvent::Error(message) => {
                warn!(error = %message, "transport error");
                let _ = self.events.emit(ChannelEvent::Error { message });
            }
            TransportEvent::Closed(frame) => {
                self.link = None;
                self.liveness.stop();
                info!(
                    connection_id = self.connection_id.as_deref().unwrap_or("-"),
                    code = frame.code,
                    reason = %frame.reason,
                    "connection closed"
                );
                self.connection_id = None;
                let _ = self.events.emit(ChannelEvent::Disconnected {
                    code: frame.code,
                    reason: frame.reason.clone(),
                });
                self.on_unexpected_close(&frame);
            }
        }
    }

    fn on_unexpected_close(&mut self, frame: &CloseFrame) {
        self.set_state(ConnectionState::Closed);
        if !self.should_reconnect {
            return;
        }
        if self.config.reconnect.is_terminal(frame.code) {
            warn!(code = frame.code, "close code is terminal, not reconnecting");
            self.fail_terminally();
            return;
        }
        match self.retry.next_delay() {
            Some(delay) => {
                let attempt = self.retry.attempts();
                info!(attempt, delay_ms = millis(delay), "scheduling reconnect");
                self.reconnect_at = Some(Instant::now() + delay);
                let _ = self
                    .events
                    .emit(ChannelEvent::ReconnectScheduled { attempt, delay });
            }
            None => self.fail_terminally(),
        }
    }

    fn fail_terminally(&mut self) {
        self.gave_up = true;
        self.reconnect_at = None;
        let attempts = self.retry.attempts();
        error!(attempts, "reconnection failed, giving up");
        let _ = self.events.emit(ChannelEvent::ReconnectFailed { attempts });
        present(self.sink.as_ref(), &UserNotification::connection_lost());
    }

    // ── Liveness ────────────────────────────────────────────────────

    fn on_liveness_tick(&mut self, tick: LivenessTick) {
        match tick {
            LivenessTick::KeepAlive => {
                let Some(link) = &self.link else { return };
                if link.send_text(PING_FRAME.to_string()) {
                    trace!("keep-alive sent");
                    self.liveness.record_activity();
                } else {
                    warn!("keep-alive could not be queued");
                }
            }
            LivenessTick::IdleCheck => {
                if self.liveness.is_idle() {
                    self.close_idle();
                }
            }
        }
    }

    fn close_idle(&mut self) {
        let idle_for = self.liveness.idle_for();
        info!(idle_secs = idle_for.as_secs(), "closing idle connection");
        self.liveness.stop();
        if let Some(link) = self.link.take() {
            link.close(CloseFrame::idle_timeout());
        }
        self.connection_id = None;
        self.set_state(ConnectionState::Closing);
        self.set_state(ConnectionState::Closed);
        let frame = CloseFrame::idle_timeout();
        let _ = self.events.emit(ChannelEvent::IdleClosed { idle_for });
        let _ = self.events.emit(ChannelEvent::Disconnected {
            code: frame.code,
            reason: frame.reason,
        });
    }

    // ── State ───────────────────────────────────────────────────────

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, to: ConnectionState) {
        let from = self.state_tx.send_replace(to);
        if from != to {
            debug!(%from, %to, "state changed");
            let _ = self.events.emit(ChannelEvent::StateChanged { from, to });
        }
    }
}

async fn poll_pending(pending: &mut Option<PendingConnect>) -> Result<TransportLink, TransportError> {
    match pending.as_mut() {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn next_transport_event(link: &mut Option<TransportLink>) -> TransportEvent {
    match link.as_mut() {
        Some(link) => link.next_event().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
