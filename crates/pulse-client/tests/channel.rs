//! End-to-end behavior of the notification channel over the in-memory
//! transport, on paused time.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, timeout};

use pulse_client::testing::{ConnectBehavior, FakeConnector, RecordingSink, ServerEnd};
use pulse_client::transport::Outbound;
use pulse_client::{
    ChannelEvent, ClientConfig, ClientError, ConnectionState, NotificationLevel, Permission,
    PulseClient, ReachabilitySignal, Subscription, UpdateDescriptor, UpdateKind,
};

const WAIT: Duration = Duration::from_secs(600);

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

struct Harness {
    client: PulseClient,
    connector: FakeConnector,
    sink: Arc<RecordingSink>,
    events: broadcast::Receiver<ChannelEvent>,
}

fn config() -> ClientConfig {
    let mut config = ClientConfig::default();
    config.endpoint.api_base_url = "https://rent.example.com/api".into();
    config
}

/// Keep-alive out of the way so only the idle watchdog matters.
fn idle_config() -> ClientConfig {
    let mut config = config();
    config.liveness.keepalive_interval = Duration::from_secs(120);
    config.liveness.idle_check_interval = Duration::from_secs(10);
    config.liveness.idle_timeout = Duration::from_secs(60);
    config
}

fn harness_with(config: ClientConfig, sink: RecordingSink) -> Harness {
    let connector = FakeConnector::new();
    let sink = Arc::new(sink);
    let client = PulseClient::spawn(config, Arc::new(connector.clone()), sink.clone());
    let events = client.subscribe_events();
    Harness {
        client,
        connector,
        sink,
        events,
    }
}

fn harness() -> Harness {
    harness_with(config(), RecordingSink::new())
}

impl Harness {
    /// Connect with `token` and return the server side of the connection.
    async fn open(&mut self, token: &str) -> ServerEnd {
        self.client.connect(token).unwrap();
        self.client.wait_for_open(WAIT).await.unwrap();
        self.connector.next_server().await.unwrap()
    }

    async fn next_event<F>(&mut self, mut pred: F) -> ChannelEvent
    where
        F: FnMut(&ChannelEvent) -> bool,
    {
        timeout(WAIT, async {
            loop {
                let event = self.events.recv().await.expect("event stream closed");
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    /// Events already emitted, without waiting.
    fn drain_events(&mut self) -> Vec<ChannelEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

fn collect_updates(client: &PulseClient) -> (Subscription, mpsc::UnboundedReceiver<UpdateDescriptor>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = client.on_data_update(move |update| {
        let _ = tx.send(update.clone());
    });
    (subscription, rx)
}

async fn next_update(rx: &mut mpsc::UnboundedReceiver<UpdateDescriptor>) -> UpdateDescriptor {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for update")
        .expect("update stream closed")
}

/// Let the connection task drain its queue.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connect / disconnect
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn connect_derives_url_and_opens() {
    let mut h = harness();
    let _server = h.open("abc").await;

    assert_eq!(h.client.state(), ConnectionState::Open);
    let attempts = h.connector.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(
        attempts[0].url.as_str(),
        "wss://rent.example.com/api/ws/notifications?token=abc"
    );
    let connected = h
        .next_event(|e| matches!(e, ChannelEvent::Connected { .. }))
        .await;
    assert_matches!(connected, ChannelEvent::Connected { connection_id } if !connection_id.is_empty());
}

#[tokio::test(start_paused = true)]
async fn connect_while_active_is_a_no_op() {
    let mut h = harness();
    let _server = h.open("abc").await;

    h.client.connect("abc").unwrap();
    h.client.connect("other-token").unwrap();
    settle().await;

    assert_eq!(h.connector.attempt_count(), 1);
    assert_eq!(h.client.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn connect_during_handshake_is_a_no_op() {
    let h = harness();
    h.connector.set_connect_delay(Duration::from_secs(2));

    h.client.connect("abc").unwrap();
    settle().await;
    assert_eq!(h.client.state(), ConnectionState::Connecting);
    h.client.connect("abc").unwrap();

    h.client.wait_for_open(WAIT).await.unwrap();
    assert_eq!(h.connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_rejects_underivable_endpoint() {
    let mut config = config();
    config.endpoint.api_base_url = "/api".into();
    config.endpoint.page_origin = None;
    let h = harness_with(config, RecordingSink::new());

    assert_matches!(h.client.connect("abc"), Err(ClientError::InvalidEndpoint(_)));
    settle().await;
    assert_eq!(h.connector.attempt_count(), 0);
    assert_eq!(h.client.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_once_and_never_reconnects() {
    let mut h = harness();
    let mut server = h.open("abc").await;

    h.client.disconnect();
    h.client.disconnect();
    settle().await;

    assert_eq!(h.client.state(), ConnectionState::Closed);
    assert_eq!(
        server.next_outbound().await,
        Some(Outbound::Close(pulse_core::CloseFrame::normal("client disconnect")))
    );

    let disconnects = h
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, ChannelEvent::Disconnected { .. }))
        .collect::<Vec<_>>();
    assert_eq!(
        disconnects,
        vec![ChannelEvent::Disconnected {
            code: 1000,
            reason: "client disconnect".into()
        }]
    );

    tokio::time::sleep(WAIT).await;
    assert_eq!(h.connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_before_connect_is_harmless() {
    let mut h = harness();
    h.client.disconnect();
    settle().await;

    assert_eq!(h.client.state(), ConnectionState::Idle);
    assert!(h.drain_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_reconnect() {
    let mut h = harness();
    let server = h.open("abc").await;
    assert!(server.drop_connection().await);
    let _ = h
        .next_event(|e| matches!(e, ChannelEvent::ReconnectScheduled { .. }))
        .await;

    h.client.disconnect();
    tokio::time::sleep(WAIT).await;
    assert_eq!(h.connector.attempt_count(), 1);
    assert_eq!(h.client.state(), ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_connection_and_rejects_commands() {
    let mut h = harness();
    let mut server = h.open("abc").await;

    h.client.shutdown().await;

    assert_matches!(server.next_outbound().await, Some(Outbound::Close(_)));
    assert_matches!(h.client.connect("abc"), Err(ClientError::ShutDown));
    assert_matches!(
        h.client.send(&json!({"type": "ack"})).await,
        Err(ClientError::ShutDown)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Reconnect
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn linear_backoff_then_terminal_failure() {
    let mut h = harness();
    h.connector.script([ConnectBehavior::Accept]);
    h.connector.set_fallback(ConnectBehavior::Refuse);
    let server = h.open("abc").await;

    let dropped_at = Instant::now();
    assert!(server.drop_connection().await);

    let mut scheduled = Vec::new();
    loop {
        match h
            .next_event(|e| {
                matches!(
                    e,
                    ChannelEvent::ReconnectScheduled { .. } | ChannelEvent::ReconnectFailed { .. }
                )
            })
            .await
        {
            ChannelEvent::ReconnectScheduled { attempt, delay } => {
                scheduled.push((attempt, delay.as_secs()));
            }
            ChannelEvent::ReconnectFailed { attempts } => {
                assert_eq!(attempts, 5);
                break;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(scheduled, vec![(1, 3), (2, 6), (3, 9), (4, 12), (5, 15)]);

    let offsets = h.connector.attempts()[1..]
        .iter()
        .map(|a| (a.at - dropped_at).as_secs())
        .collect::<Vec<_>>();
    assert_eq!(offsets, vec![3, 9, 18, 30, 45]);

    tokio::time::sleep(WAIT).await;
    assert_eq!(h.connector.attempt_count(), 6);
    assert_eq!(h.client.state(), ConnectionState::Closed);

    let lost = h.sink.shown().pop().unwrap();
    assert_eq!(lost.title, "Connection lost");
    assert_eq!(lost.level, NotificationLevel::Error);
}

#[tokio::test(start_paused = true)]
async fn successful_open_resets_retry_budget() {
    let mut h = harness();
    h.connector
        .script([ConnectBehavior::Accept, ConnectBehavior::Refuse, ConnectBehavior::Accept]);
    let server = h.open("abc").await;
    assert!(server.drop_connection().await);

    let _ = h
        .next_event(|e| matches!(e, ChannelEvent::ReconnectScheduled { attempt: 2, .. }))
        .await;
    h.client.wait_for_open(WAIT).await.unwrap();
    let server = h.connector.next_server().await.unwrap();
    assert_eq!(h.connector.attempt_count(), 3);

    assert!(server.close(1011, "restart").await);
    let scheduled = h
        .next_event(|e| matches!(e, ChannelEvent::ReconnectScheduled { .. }))
        .await;
    assert_eq!(
        scheduled,
        ChannelEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_secs(3)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn policy_violation_close_is_terminal() {
    let mut h = harness();
    let server = h.open("abc").await;
    assert!(server.close(1008, "invalid token").await);

    let failed = h
        .next_event(|e| matches!(e, ChannelEvent::ReconnectFailed { .. }))
        .await;
    assert_eq!(failed, ChannelEvent::ReconnectFailed { attempts: 0 });
    assert_eq!(h.sink.shown().last().unwrap().title, "Connection lost");

    // Host signals do not revive a failed session.
    h.client.notify_reachability(ReachabilitySignal::Visible).unwrap();
    tokio::time::sleep(WAIT).await;
    assert_eq!(h.connector.attempt_count(), 1);

    // An explicit connect does.
    h.client.connect("abc").unwrap();
    h.client.wait_for_open(WAIT).await.unwrap();
    assert_eq!(h.connector.attempt_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn server_close_with_idle_reason_still_reconnects() {
    let mut h = harness();
    let server = h.open("abc").await;
    assert!(server.close(1011, "idle_timeout").await);

    let scheduled = h
        .next_event(|e| matches!(e, ChannelEvent::ReconnectScheduled { .. }))
        .await;
    assert_eq!(
        scheduled,
        ChannelEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_secs(3)
        }
    );
    h.client.wait_for_open(WAIT).await.unwrap();
    assert_eq!(h.connector.attempt_count(), 2);
    assert_eq!(h.client.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn wait_for_open_reports_give_up() {
    let mut config = config();
    config.reconnect.max_retries = 1;
    let h = harness_with(config, RecordingSink::new());
    h.connector.set_fallback(ConnectBehavior::Refuse);

    h.client.connect("abc").unwrap();
    assert_matches!(h.client.wait_for_open(WAIT).await, Err(ClientError::Closed));
    assert_eq!(h.connector.attempt_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn wait_for_open_times_out() {
    let h = harness();
    h.connector.set_connect_delay(Duration::from_secs(30));

    h.client.connect("abc").unwrap();
    let limit = Duration::from_secs(1);
    assert_matches!(
        h.client.wait_for_open(limit).await,
        Err(ClientError::Timeout(d)) if d == limit
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Liveness
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn keep_alive_pings_hold_the_connection_open() {
    let mut h = harness();
    let mut server = h.open("abc").await;

    tokio::time::sleep(Duration::from_secs(305)).await;

    assert_eq!(h.client.state(), ConnectionState::Open);
    let pings = server
        .drain_outbound()
        .into_iter()
        .filter(|frame| *frame == Outbound::Text("ping".into()))
        .count();
    assert_eq!(pings, 10);
}

#[tokio::test(start_paused = true)]
async fn idle_connection_is_closed_and_not_retried() {
    let mut h = harness_with(idle_config(), RecordingSink::new());
    let mut server = h.open("abc").await;
    let opened_at = Instant::now();

    let idle = h
        .next_event(|e| matches!(e, ChannelEvent::IdleClosed { .. }))
        .await;
    let closed_after = opened_at.elapsed();
    assert!(closed_after >= Duration::from_secs(60) && closed_after < Duration::from_secs(61));
    assert_matches!(idle, ChannelEvent::IdleClosed { idle_for } if idle_for >= Duration::from_secs(60));

    let disconnected = h
        .next_event(|e| matches!(e, ChannelEvent::Disconnected { .. }))
        .await;
    assert_eq!(
        disconnected,
        ChannelEvent::Disconnected {
            code: 1000,
            reason: "idle_timeout".into()
        }
    );
    assert_eq!(
        server.next_outbound().await,
        Some(Outbound::Close(pulse_core::CloseFrame::idle_timeout()))
    );
    assert_eq!(h.client.state(), ConnectionState::Closed);

    tokio::time::sleep(WAIT).await;
    assert_eq!(h.connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn inbound_traffic_postpones_idle_close() {
    let mut h = harness_with(idle_config(), RecordingSink::new());
    let server = h.open("abc").await;
    let opened_at = Instant::now();

    tokio::time::sleep(Duration::from_secs(40)).await;
    assert!(server.send_text(r#"{"type":"pong"}"#).await);

    let _ = h
        .next_event(|e| matches!(e, ChannelEvent::IdleClosed { .. }))
        .await;
    let closed_after = opened_at.elapsed();
    assert!(closed_after >= Duration::from_secs(100) && closed_after < Duration::from_secs(101));
}

#[tokio::test(start_paused = true)]
async fn send_after_idle_close_reconnects() {
    let mut h = harness_with(idle_config(), RecordingSink::new());
    let _server = h.open("abc").await;
    let _ = h
        .next_event(|e| matches!(e, ChannelEvent::IdleClosed { .. }))
        .await;

    assert_matches!(
        h.client.send(&json!({"type": "ack"})).await,
        Err(ClientError::NotConnected)
    );
    h.client.wait_for_open(WAIT).await.unwrap();
    assert_eq!(h.connector.attempt_count(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Reachability
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn visible_after_idle_close_reconnects_and_publishes() {
    let mut h = harness_with(idle_config(), RecordingSink::new());
    let (_sub, mut updates) = collect_updates(&h.client);
    let _server = h.open("abc").await;
    let _ = h
        .next_event(|e| matches!(e, ChannelEvent::IdleClosed { .. }))
        .await;

    h.client.notify_reachability(ReachabilitySignal::Visible).unwrap();

    let update = next_update(&mut updates).await;
    assert_eq!(update.kind, UpdateKind::PageVisible);
    assert_eq!(update.reason.as_deref(), Some("user_returned"));
    h.client.wait_for_open(WAIT).await.unwrap();
    assert_eq!(h.connector.attempt_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn online_waits_for_settle_delay() {
    let mut h = harness_with(idle_config(), RecordingSink::new());
    let (_sub, mut updates) = collect_updates(&h.client);
    let _server = h.open("abc").await;
    let _ = h
        .next_event(|e| matches!(e, ChannelEvent::IdleClosed { .. }))
        .await;

    let signalled_at = Instant::now();
    h.client.notify_reachability(ReachabilitySignal::Online).unwrap();

    let update = next_update(&mut updates).await;
    assert_eq!(update.kind, UpdateKind::NetworkRestored);
    assert_eq!(update.reason.as_deref(), Some("connection_online"));
    assert_eq!(signalled_at.elapsed().as_secs(), 1);

    h.client.wait_for_open(WAIT).await.unwrap();
    let reconnect = &h.connector.attempts()[1];
    assert_eq!((reconnect.at - signalled_at).as_secs(), 1);
}

#[tokio::test(start_paused = true)]
async fn hidden_and_offline_change_nothing() {
    let mut h = harness_with(idle_config(), RecordingSink::new());
    let (_sub, mut updates) = collect_updates(&h.client);
    let _server = h.open("abc").await;
    let _ = h
        .next_event(|e| matches!(e, ChannelEvent::IdleClosed { .. }))
        .await;

    h.client.notify_reachability(ReachabilitySignal::Hidden).unwrap();
    h.client.notify_reachability(ReachabilitySignal::Offline).unwrap();
    tokio::time::sleep(WAIT).await;

    assert_eq!(h.connector.attempt_count(), 1);
    assert!(updates.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn host_signals_publish_without_a_session() {
    let h = harness();
    let (_sub, mut updates) = collect_updates(&h.client);

    let signals = futures::stream::iter([ReachabilitySignal::Focus, ReachabilitySignal::Restored]);
    h.client.attach_reachability(signals).await.unwrap();

    assert_eq!(next_update(&mut updates).await.kind, UpdateKind::PageVisible);
    assert_eq!(next_update(&mut updates).await.kind, UpdateKind::PageVisible);
    assert_eq!(h.connector.attempt_count(), 0);
    assert_eq!(h.client.state(), ConnectionState::Idle);
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn domain_event_notifies_and_publishes_once() {
    let mut h = harness();
    let (_sub, mut updates) = collect_updates(&h.client);
    let server = h.open("abc").await;

    assert!(server.send_text(r#"{"type":"connected"}"#).await);
    let _ = h.next_event(|e| *e == ChannelEvent::Confirmed).await;

    let frame = json!({
        "type": "resource-returned",
        "data": {"title": "Thanks", "order_id": "o-1"}
    });
    assert!(server.send_text(&frame.to_string()).await);

    let update = next_update(&mut updates).await;
    assert_eq!(update.kind, UpdateKind::ResourceReturned);
    assert_eq!(update.order_id().as_deref(), Some("o-1"));

    let shown = h.sink.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Thanks");
    assert_eq!(shown[0].tag.as_deref(), Some("resource-returned-o-1"));
    assert!(h.sink.host_shown().is_empty());
    assert!(updates.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn malformed_and_unknown_frames_are_skipped() {
    let mut h = harness();
    let (_sub, mut updates) = collect_updates(&h.client);
    let server = h.open("abc").await;

    assert!(server.send_text("not json").await);
    let error = h
        .next_event(|e| matches!(e, ChannelEvent::Error { .. }))
        .await;
    assert_matches!(error, ChannelEvent::Error { .. });

    assert!(server.send_text(r#"{"type":"mystery","data":{}}"#).await);
    let seen = h
        .next_event(|e| matches!(e, ChannelEvent::Message(_)))
        .await;
    assert_matches!(seen, ChannelEvent::Message(m) if m.message_type == "mystery");

    assert!(server.send_text(r#"{"type":"resource-borrowed","data":{}}"#).await);
    assert_eq!(next_update(&mut updates).await.kind, UpdateKind::ResourceBorrowed);

    assert_eq!(h.sink.shown().len(), 1);
    assert_eq!(h.client.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn transport_error_keeps_connection() {
    let mut h = harness();
    let server = h.open("abc").await;

    assert!(server.error("frame too large").await);
    let error = h
        .next_event(|e| matches!(e, ChannelEvent::Error { .. }))
        .await;
    assert_eq!(
        error,
        ChannelEvent::Error {
            message: "frame too large".into()
        }
    );
    settle().await;
    assert_eq!(h.client.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn error_then_drop_schedules_one_reconnect() {
    let mut h = harness();
    let server = h.open("abc").await;
    let _ = h.drain_events();

    assert!(server.error("boom").await);
    assert!(server.drop_connection().await);

    let mut seen = Vec::new();
    loop {
        let event = h.next_event(|_| true).await;
        let reconnected = matches!(event, ChannelEvent::Connected { .. });
        seen.push(event);
        if reconnected {
            break;
        }
    }
    let scheduled = seen
        .iter()
        .filter(|e| matches!(e, ChannelEvent::ReconnectScheduled { .. }))
        .collect::<Vec<_>>();
    assert_eq!(
        scheduled,
        vec![&ChannelEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_secs(3)
        }]
    );
    assert!(seen.contains(&ChannelEvent::Error {
        message: "boom".into()
    }));

    h.client.wait_for_open(WAIT).await.unwrap();
    let _server = h.connector.next_server().await.unwrap();
    settle().await;
    assert_eq!(h.connector.attempt_count(), 2);
    assert!(!h
        .drain_events()
        .iter()
        .any(|e| matches!(e, ChannelEvent::ReconnectScheduled { .. })));
}

#[tokio::test(start_paused = true)]
async fn debug_output_counts_receivers_and_events() {
    let mut h = harness();
    let _server = h.open("abc").await;
    let (_subscription, _rx) = collect_updates(&h.client);
    settle().await;

    let emitted = h.drain_events().len();
    assert!(emitted > 0);
    let rendered = format!("{:?}", h.client);
    assert!(rendered.contains("subscribers: 1"), "{rendered}");
    assert!(rendered.contains("event_receivers: 1"), "{rendered}");
    assert!(rendered.contains(&format!("events_emitted: {emitted}")), "{rendered}");
}

#[tokio::test(start_paused = true)]
async fn unsubscribed_consumer_stops_receiving() {
    let mut h = harness();
    let (first, mut first_rx) = collect_updates(&h.client);
    let (_second, mut second_rx) = collect_updates(&h.client);
    let server = h.open("abc").await;

    assert!(first.unsubscribe());
    assert!(!first.unsubscribe());

    assert!(server.send_text(r#"{"type":"resource-returned","data":{}}"#).await);
    assert_eq!(next_update(&mut second_rx).await.kind, UpdateKind::ResourceReturned);
    assert!(first_rx.try_recv().is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Send / permission
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn send_writes_json_when_open() {
    let mut h = harness();
    let mut server = h.open("abc").await;

    let frame = json!({"type": "ack", "id": 7});
    h.client.send(&frame).await.unwrap();
    let written = server.next_outbound().await;
    assert_matches!(
        written,
        Some(Outbound::Text(text)) if serde_json::from_str::<serde_json::Value>(&text).unwrap() == frame
    );
}

#[tokio::test(start_paused = true)]
async fn send_before_connect_fails() {
    let h = harness();
    assert_matches!(
        h.client.send(&json!({"type": "ack"})).await,
        Err(ClientError::NotConnected)
    );
    assert_eq!(h.connector.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn permission_is_requested_once() {
    let h = harness_with(config(), RecordingSink::new().grant_on_request());

    assert!(h.client.request_notification_permission().await);
    assert!(h.client.request_notification_permission().await);
    assert_eq!(h.sink.permission_requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn denied_permission_is_not_requested_again() {
    let h = harness_with(config(), RecordingSink::with_permission(Permission::Denied));

    assert!(!h.client.request_notification_permission().await);
    assert_eq!(h.sink.permission_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn granted_permission_shows_host_notifications() {
    let mut h = harness_with(config(), RecordingSink::with_permission(Permission::Granted));
    let (_sub, mut updates) = collect_updates(&h.client);
    let server = h.open("abc").await;

    assert!(server.send_text(r#"{"type":"resource-returned","data":{}}"#).await);
    let _ = next_update(&mut updates).await;

    assert_eq!(h.sink.shown().len(), 1);
    assert_eq!(h.sink.host_shown().len(), 1);
    assert_eq!(h.sink.host_shown()[0].title, "Thanks for returning!");
}
