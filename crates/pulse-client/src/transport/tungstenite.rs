//! WebSocket transport over `tokio-tungstenite`.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use pulse_core::CloseFrame;
use pulse_core::wire::close_code;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as WsCloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use super::{
    Connector, INBOUND_CAPACITY, OUTBOUND_CAPACITY, Outbound, TransportError, TransportEvent,
    TransportLink,
};
use crate::endpoint::redacted;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for the server's close reply after sending ours.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Production connector.
#[derive(Clone, Debug)]
pub struct TungsteniteConnector {
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    /// Connector whose attempts give up after `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<TransportLink, TransportError> {
        debug!(url = %redacted(url), "opening websocket");
        let (ws, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(INBOUND_CAPACITY);
        let _pump = tokio::spawn(pump(ws, out_rx, in_tx));
        Ok(TransportLink::new(out_tx, in_rx))
    }
}

/// Shuttle frames between the socket and the link until either side ends.
///
/// Always finishes by reporting exactly one `Closed` event.
async fn pump(
    ws: WsStream,
    mut out_rx: mpsc::Receiver<Outbound>,
    in_tx: mpsc::Sender<TransportEvent>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let closed = loop {
        tokio::select! {
            cmd = out_rx.recv() => {
                match cmd {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                            let _ = in_tx.send(TransportEvent::Error(e.to_string())).await;
                            break CloseFrame::abnormal();
                        }
                    }
                    Some(Outbound::Close(frame)) => {
                        let _ = ws_tx.send(Message::Close(Some(to_ws_close(&frame)))).await;
                        let _ = tokio::time::timeout(CLOSE_GRACE, async {
                            while let Some(Ok(msg)) = ws_rx.next().await {
                                if msg.is_close() {
                                    break;
                                }
                            }
                        })
                        .await;
                        break frame;
                    }
                    None => {
                        // Link dropped without an explicit close.
                        let _ = ws_tx.close().await;
                        return;
                    }
                }
            }
            msg = ws_rx.next() => {
                let event = match msg {
                    Some(Ok(Message::Text(text))) => TransportEvent::Message(text.as_str().to_owned()),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => TransportEvent::Message(text),
                        Err(_) => {
                            warn!(len = bytes.len(), "dropping non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => TransportEvent::Heartbeat,
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map_or_else(
                            || CloseFrame::new(close_code::NO_STATUS, ""),
                            |f| from_ws_close(&f),
                        );
                    }
                    Some(Ok(Message::Frame(_))) => continue,
                    Some(Err(e)) => {
                        let _ = in_tx.send(TransportEvent::Error(e.to_string())).await;
                        break CloseFrame::abnormal();
                    }
                    None => break CloseFrame::abnormal(),
                };
                if in_tx.send(event).await.is_err() {
                    let _ = ws_tx.close().await;
                    return;
                }
            }
        }
    };

    // Flushes the queued close reply when the server initiated.
    let _ = ws_tx.close().await;
    debug!(code = closed.code, reason = %closed.reason, "websocket pump finished");
    let _ = in_tx.send(TransportEvent::Closed(closed)).await;
}

fn to_ws_close(frame: &CloseFrame) -> WsCloseFrame {
    WsCloseFrame {
        code: CloseCode::from(frame.code),
        reason: frame.reason.clone().into(),
    }
}

fn from_ws_close(frame: &WsCloseFrame) -> CloseFrame {
    CloseFrame::new(u16::from(frame.code), frame.reason.as_str())
}
