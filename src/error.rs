// Error taxonomy: transport, data and storage failures. None of these is fatal.

use thiserror::Error;

/// Push or pull transport failures. Handled by the reconnect/fallback logic.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("server closed the connection")]
    ServerDisconnect,

    #[error("connection closed: {0}")]
    Closed(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                TransportError::Closed("transport close".into())
            }
            WsError::Io(e) => TransportError::Connect(e.to_string()),
            WsError::Protocol(e) => TransportError::Protocol(e.to_string()),
            other => TransportError::Connect(other.to_string()),
        }
    }
}

/// Malformed frames or payloads. Field-level problems never surface here;
/// they are defaulted during deserialization.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    #[error("empty frame")]
    EmptyFrame,

    #[error("unknown packet type {0:?}")]
    UnknownPacket(char),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Malformed(err.to_string())
    }
}

/// Local preference persistence failures; logged only.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("preferences I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("preferences encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}
