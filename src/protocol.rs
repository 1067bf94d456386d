// Push channel wire format: Engine.IO v4 packets carrying Socket.IO v5 frames,
// one packet per WebSocket text message.

use serde::Deserialize;
use serde_json::Value;

use crate::error::DataError;
use crate::models::{AlertData, MessageBody};

/// WebSocket path of the push endpoint, relative to the backend base URL.
pub const SOCKET_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

pub const PONG: &str = "3";
/// Socket.IO CONNECT to the default namespace.
pub const CONNECT: &str = "40";
pub const DISCONNECT: &str = "41";

// Outbound event names.
pub const REQUEST_CURRENT_DATA: &str = "request_current_data";
pub const PAUSE_UPDATES: &str = "pause_updates";
pub const RESUME_UPDATES: &str = "resume_updates";

/// Engine.IO handshake payload (`0{...}`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    #[serde(default)]
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Noop,
    /// Socket.IO CONNECT acknowledgement from the server.
    Connect,
    /// Server-initiated namespace disconnect.
    Disconnect,
    Event { name: String, args: Vec<Value> },
    ConnectError(String),
    /// Acks, binary frames, upgrade probes: nothing this client acts on.
    Ignored,
}

pub fn decode(frame: &str) -> Result<Packet, DataError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(DataError::EmptyFrame)?;
    let rest = chars.as_str();
    match kind {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_message(rest),
        '5' => Ok(Packet::Ignored),
        '6' => Ok(Packet::Noop),
        other => Err(DataError::UnknownPacket(other)),
    }
}

fn decode_message(frame: &str) -> Result<Packet, DataError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(DataError::EmptyFrame)?;
    let body = skip_namespace(chars.as_str());
    match kind {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => {
            let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
            let mut args: Vec<Value> = serde_json::from_str(body)?;
            if args.is_empty() {
                return Err(DataError::Malformed("event without a name".into()));
            }
            match args.remove(0) {
                Value::String(name) => Ok(Packet::Event { name, args }),
                other => Err(DataError::Malformed(format!("event name {other}"))),
            }
        }
        '4' => {
            let message = serde_json::from_str::<MessageBody>(body)
                .map(|b| b.message)
                .unwrap_or_else(|_| body.to_string());
            Ok(Packet::ConnectError(message))
        }
        '3' | '5' | '6' => Ok(Packet::Ignored),
        other => Err(DataError::UnknownPacket(other)),
    }
}

/// Strips a `/namespace,` prefix.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(i) => &body[i + 1..],
            None => "",
        }
    } else {
        body
    }
}

/// `42["name",payload]`, or `42["name"]` without a payload.
pub fn encode_event(name: &str, payload: Option<&Value>) -> String {
    let frame = match payload {
        Some(p) if !p.is_null() => Value::Array(vec![Value::String(name.into()), p.clone()]),
        _ => Value::Array(vec![Value::String(name.into())]),
    };
    format!("42{frame}")
}

/// Named server events, typed.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Status(String),
    MonitoringData(Value),
    DnsQuery(Value),
    SystemAlert(AlertData),
    Error(String),
    /// Server asks the client to drop its state and fetch a fresh baseline.
    Resync,
    Other(String),
}

impl InboundEvent {
    pub fn from_event(name: &str, mut args: Vec<Value>) -> Self {
        let payload = if args.is_empty() {
            Value::Null
        } else {
            args.swap_remove(0)
        };
        match name {
            "status" => InboundEvent::Status(message_of(payload)),
            "monitoring_data" => InboundEvent::MonitoringData(payload),
            "dns_query" => InboundEvent::DnsQuery(payload),
            "system_alert" => {
                InboundEvent::SystemAlert(serde_json::from_value(payload).unwrap_or_default())
            }
            "error" => InboundEvent::Error(message_of(payload)),
            "resync" => InboundEvent::Resync,
            other => InboundEvent::Other(other.to_string()),
        }
    }
}

fn message_of(payload: Value) -> String {
    match payload {
        Value::String(s) => s,
        other => serde_json::from_value::<MessageBody>(other)
            .map(|b| b.message)
            .unwrap_or_default(),
    }
}
