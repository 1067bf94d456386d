// Push session: one WebSocket connection attempt and its lifetime, as a task.
// The task only does I/O; every outcome is reported back as a signal.

use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, instrument, warn};

use super::Signal;
use crate::error::TransportError;
use crate::protocol::{self, InboundEvent, OpenInfo, Packet};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a live push session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Server closed the namespace; always followed by a forced reconnect.
    ServerDisconnect,
    TransportClose,
    TransportError(String),
    PingTimeout,
    ClientDisconnect,
    NetworkOffline,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ServerDisconnect => f.write_str("io server disconnect"),
            DisconnectReason::TransportClose => f.write_str("transport close"),
            DisconnectReason::TransportError(e) => write!(f, "transport error: {e}"),
            DisconnectReason::PingTimeout => f.write_str("ping timeout"),
            DisconnectReason::ClientDisconnect => f.write_str("io client disconnect"),
            DisconnectReason::NetworkOffline => f.write_str("network offline"),
        }
    }
}

#[derive(Debug)]
pub(crate) enum PushSignal {
    Opened,
    Failed(TransportError),
    Inbound(InboundEvent),
    Closed(DisconnectReason),
}

/// Handle to a running session task. Dropping it aborts the task.
#[derive(Debug)]
pub(crate) struct PushSession {
    pub(crate) id: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl PushSession {
    /// Hands an encoded frame to the socket writer. The frame comes back when
    /// the task is gone.
    pub(crate) fn send(&self, frame: String) -> Result<(), String> {
        match &self.outbound {
            Some(tx) => tx.send(frame).map_err(|e| e.0),
            None => Err(frame),
        }
    }

    /// Graceful close: the task sends a namespace disconnect and exits on its own.
    pub(crate) fn close(mut self) {
        self.outbound.take();
        self.handle.take();
    }
}

impl Drop for PushSession {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

struct Reporter {
    session: u64,
    tx: mpsc::UnboundedSender<Signal>,
}

impl Reporter {
    fn send(&self, signal: PushSignal) {
        let _ = self.tx.send(Signal::Push {
            session: self.session,
            signal,
        });
    }
}

pub(crate) fn spawn(
    id: u64,
    url: String,
    connect_timeout: Duration,
    signals: mpsc::UnboundedSender<Signal>,
) -> PushSession {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let reporter = Reporter {
        session: id,
        tx: signals,
    };
    let handle = tokio::spawn(run(url, connect_timeout, reporter, out_rx));
    PushSession {
        id,
        outbound: Some(out_tx),
        handle: Some(handle),
    }
}

#[instrument(skip_all, fields(session = reporter.session))]
async fn run(
    url: String,
    connect_timeout: Duration,
    reporter: Reporter,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let (mut ws, open) = match timeout(connect_timeout, handshake(&url)).await {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => {
            reporter.send(PushSignal::Failed(e));
            return;
        }
        Err(_) => {
            reporter.send(PushSignal::Failed(TransportError::Timeout {
                operation: "push connect",
                timeout_ms: connect_timeout.as_millis() as u64,
            }));
            return;
        }
    };
    debug!(sid = %open.sid, ping_interval = open.ping_interval, "push handshake complete");
    reporter.send(PushSignal::Opened);
    let reason = pump(&mut ws, &open, &reporter, &mut outbound).await;
    reporter.send(PushSignal::Closed(reason));
}

/// Engine.IO open, then Socket.IO namespace connect.
async fn handshake(url: &str) -> Result<(WsStream, OpenInfo), TransportError> {
    let (mut ws, _) = connect_async(url).await?;

    let open = loop {
        match decode_next(&mut ws).await? {
            Packet::Open(info) => break info,
            Packet::Noop => continue,
            other => {
                return Err(TransportError::Protocol(format!(
                    "expected open packet, got {other:?}"
                )));
            }
        }
    };

    ws.send(Message::Text(protocol::CONNECT.into())).await?;
    loop {
        match decode_next(&mut ws).await? {
            Packet::Connect => return Ok((ws, open)),
            Packet::Ping => ws.send(Message::Text(protocol::PONG.into())).await?,
            Packet::ConnectError(message) => return Err(TransportError::Connect(message)),
            Packet::Close | Packet::Disconnect => return Err(TransportError::ServerDisconnect),
            _ => continue,
        }
    }
}

async fn decode_next(ws: &mut WsStream) -> Result<Packet, TransportError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return protocol::decode(&text).map_err(|e| TransportError::Protocol(e.to_string()));
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::Closed("transport close".into()));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Reads events and writes outbound frames until the session ends.
async fn pump(
    ws: &mut WsStream,
    open: &OpenInfo,
    reporter: &Reporter,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> DisconnectReason {
    let liveness = Duration::from_millis(open.ping_interval + open.ping_timeout);
    let watchdog = sleep(liveness);
    tokio::pin!(watchdog);

    loop {
        tokio::select! {
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => match protocol::decode(&text) {
                    Ok(Packet::Ping) => {
                        watchdog.as_mut().reset(Instant::now() + liveness);
                        if let Err(e) = ws.send(Message::Text(protocol::PONG.into())).await {
                            return DisconnectReason::TransportError(e.to_string());
                        }
                    }
                    Ok(Packet::Event { name, args }) => {
                        reporter.send(PushSignal::Inbound(InboundEvent::from_event(&name, args)));
                    }
                    Ok(Packet::Disconnect) => return DisconnectReason::ServerDisconnect,
                    Ok(Packet::Close) => return DisconnectReason::TransportClose,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, operation = "decode_frame", "dropping malformed push frame");
                    }
                },
                Some(Ok(Message::Close(_))) | None => return DisconnectReason::TransportClose,
                Some(Ok(_)) => {}
                Some(Err(e)) => return DisconnectReason::TransportError(e.to_string()),
            },
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = ws.send(Message::Text(frame)).await {
                        return DisconnectReason::TransportError(e.to_string());
                    }
                }
                None => {
                    let _ = ws.send(Message::Text(protocol::DISCONNECT.into())).await;
                    let _ = ws.close(None).await;
                    return DisconnectReason::ClientDisconnect;
                }
            },
            _ = &mut watchdog => return DisconnectReason::PingTimeout,
        }
    }
}
