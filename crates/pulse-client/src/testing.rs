//! Test doubles for the transport and notification seams.
//!
//! [`FakeConnector`] records every connect attempt and hands the test a
//! [`ServerEnd`] for each accepted connection, so a test can push frames,
//! read what the client wrote and close with any code. [`RecordingSink`]
//! keeps every notification it is asked to show.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pulse_core::CloseFrame;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use crate::notify::{NotificationSink, Permission, UserNotification};
use crate::transport::{Connector, Outbound, TransportError, TransportEvent, TransportLink};

// ─────────────────────────────────────────────────────────────────────────────
// Connector
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of one scripted connect attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectBehavior {
    /// Open a connection.
    Accept,
    /// Fail with a connect error.
    Refuse,
}

/// One observed connect attempt.
#[derive(Clone, Debug)]
pub struct ConnectAttempt {
    /// Requested URL, token included.
    pub url: Url,
    /// When the attempt started.
    pub at: Instant,
}

struct FakeInner {
    script: Mutex<VecDeque<ConnectBehavior>>,
    fallback: Mutex<ConnectBehavior>,
    delay: Mutex<Duration>,
    attempts: Mutex<Vec<ConnectAttempt>>,
    servers_tx: mpsc::UnboundedSender<ServerEnd>,
    servers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<ServerEnd>>,
}

/// In-memory [`Connector`]. Clones share state.
#[derive(Clone)]
pub struct FakeConnector {
    inner: Arc<FakeInner>,
}

impl FakeConnector {
    /// Connector that accepts every attempt.
    pub fn new() -> Self {
        let (servers_tx, servers_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(FakeInner {
                script: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(ConnectBehavior::Accept),
                delay: Mutex::new(Duration::ZERO),
                attempts: Mutex::new(Vec::new()),
                servers_tx,
                servers_rx: tokio::sync::Mutex::new(servers_rx),
            }),
        }
    }

    /// Queue outcomes for the next attempts, in order.
    pub fn script(&self, behaviors: impl IntoIterator<Item = ConnectBehavior>) {
        self.inner.script.lock().extend(behaviors);
    }

    /// Outcome once the script is used up.
    pub fn set_fallback(&self, behavior: ConnectBehavior) {
        *self.inner.fallback.lock() = behavior;
    }

    /// Make each attempt take `delay` before resolving.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.inner.delay.lock() = delay;
    }

    /// Attempts so far.
    pub fn attempts(&self) -> Vec<ConnectAttempt> {
        self.inner.attempts.lock().clone()
    }

    /// Number of attempts so far.
    pub fn attempt_count(&self) -> usize {
        self.inner.attempts.lock().len()
    }

    /// Server side of the next accepted connection, in accept order.
    pub async fn next_server(&self) -> Option<ServerEnd> {
        self.inner.servers_rx.lock().await.recv().await
    }
}

impl Default for FakeConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &Url) -> Result<TransportLink, TransportError> {
        self.inner.attempts.lock().push(ConnectAttempt {
            url: url.clone(),
            at: Instant::now(),
        });

        let delay = *self.inner.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.inner.script.lock().pop_front();
        let behavior = scripted.unwrap_or_else(|| *self.inner.fallback.lock());
        match behavior {
            ConnectBehavior::Refuse => Err(TransportError::Connect("connection refused".into())),
            ConnectBehavior::Accept => {
                let (out_tx, out_rx) = mpsc::channel(64);
                let (in_tx, in_rx) = mpsc::channel(64);
                let _ = self.inner.servers_tx.send(ServerEnd {
                    to_client: in_tx,
                    from_client: out_rx,
                });
                Ok(TransportLink::new(out_tx, in_rx))
            }
        }
    }
}

/// Server side of one fake connection.
pub struct ServerEnd {
    to_client: mpsc::Sender<TransportEvent>,
    from_client: mpsc::Receiver<Outbound>,
}

impl ServerEnd {
    /// Push a text frame. `false` once the client let go of the connection.
    pub async fn send_text(&self, text: &str) -> bool {
        self.to_client
            .send(TransportEvent::Message(text.to_string()))
            .await
            .is_ok()
    }

    /// Push a protocol-level heartbeat.
    pub async fn heartbeat(&self) -> bool {
        self.to_client.send(TransportEvent::Heartbeat).await.is_ok()
    }

    /// Report a non-fatal transport error.
    pub async fn error(&self, message: &str) -> bool {
        self.to_client
            .send(TransportEvent::Error(message.to_string()))
            .await
            .is_ok()
    }

    /// Close the connection from the server side.
    pub async fn close(self, code: u16, reason: &str) -> bool {
        self.to_client
            .send(TransportEvent::Closed(CloseFrame::new(code, reason)))
            .await
            .is_ok()
    }

    /// Drop the connection without a close frame.
    pub async fn drop_connection(self) -> bool {
        self.close(pulse_core::wire::close_code::ABNORMAL, "").await
    }

    /// Next frame the client wrote. `None` once the client let go.
    pub async fn next_outbound(&mut self) -> Option<Outbound> {
        self.from_client.recv().await
    }

    /// Every frame the client has written so far, without waiting.
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Notification sink
// ─────────────────────────────────────────────────────────────────────────────

/// Sink that records what it is asked to show.
#[derive(Default)]
pub struct RecordingSink {
    shown: Mutex<Vec<UserNotification>>,
    host_shown: Mutex<Vec<UserNotification>>,
    permission: Mutex<Permission>,
    grant_on_request: bool,
    requests: AtomicUsize,
}

impl RecordingSink {
    /// Sink whose permission has never been requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink with a preset permission.
    pub fn with_permission(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            ..Self::default()
        }
    }

    /// Grant permission when asked (denies otherwise).
    #[must_use]
    pub fn grant_on_request(mut self) -> Self {
        self.grant_on_request = true;
        self
    }

    /// In-app notifications shown so far.
    pub fn shown(&self) -> Vec<UserNotification> {
        self.shown.lock().clone()
    }

    /// Host-level notifications shown so far.
    pub fn host_shown(&self) -> Vec<UserNotification> {
        self.host_shown.lock().clone()
    }

    /// Times the host was prompted.
    pub fn permission_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn show(&self, notification: &UserNotification) {
        self.shown.lock().push(notification.clone());
    }

    fn host_permission(&self) -> Permission {
        *self.permission.lock()
    }

    async fn request_host_permission(&self) -> Permission {
        let _ = self.requests.fetch_add(1, Ordering::SeqCst);
        let decided = if self.grant_on_request {
            Permission::Granted
        } else {
            Permission::Denied
        };
        *self.permission.lock() = decided;
        decided
    }

    fn show_host(&self, notification: &UserNotification) {
        self.host_shown.lock().push(notification.clone());
    }
}
