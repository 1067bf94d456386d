// Shared test helpers: an in-process fake backend and a recording Renderer

#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Local};
use dnsmon::config::AppConfig;
use dnsmon::models::{AlertData, QueryRecord};
use dnsmon::render::{Renderer, SnapshotView};
use dnsmon::transport::{ConnectionState, TransportChannel, TransportConfig, TransportEvent};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, timeout, timeout_at};

fn open_packet(ping_interval_ms: u64, ping_timeout_ms: u64) -> String {
    format!(
        r#"0{{"sid":"fake-sid","upgrades":[],"pingInterval":{ping_interval_ms},"pingTimeout":{ping_timeout_ms},"maxPayload":1000000}}"#
    )
}

pub struct BackendState {
    pub system: Mutex<Value>,
    pub dns: Mutex<Value>,
    pub system_status: AtomicU16,
    /// Delay before `/api/system/stats` answers.
    pub system_delay_ms: AtomicU64,
    /// Requests seen on `/api/system/stats`.
    pub poll_requests: AtomicUsize,
    pub ws_enabled: AtomicBool,
    /// Upgrade the socket but never send the open packet.
    pub ws_silent: AtomicBool,
    pub ws_attempts: AtomicUsize,
    /// Advertised in the open packet. No pings are ever sent.
    pub ping_interval_ms: AtomicU64,
    pub ping_timeout_ms: AtomicU64,
    /// Frames received from clients, excluding the namespace connect.
    pub received: Mutex<Vec<String>>,
    pub push: broadcast::Sender<String>,
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let (push, _) = broadcast::channel(64);
        let state = Arc::new(BackendState {
            system: Mutex::new(system_json(25.0)),
            dns: Mutex::new(dns_json()),
            system_status: AtomicU16::new(200),
            system_delay_ms: AtomicU64::new(0),
            poll_requests: AtomicUsize::new(0),
            ws_enabled: AtomicBool::new(true),
            ws_silent: AtomicBool::new(false),
            ws_attempts: AtomicUsize::new(0),
            ping_interval_ms: AtomicU64::new(25_000),
            ping_timeout_ms: AtomicU64::new(20_000),
            received: Mutex::new(Vec::new()),
            push,
        });
        let app = Router::new()
            .route("/api/system/stats", get(system_stats))
            .route("/api/dns/stats", get(dns_stats))
            .route("/socket.io/", get(socket))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Sends a raw Engine.IO frame to every connected client.
    pub fn push(&self, frame: &str) {
        let _ = self.state.push.send(frame.to_string());
    }

    pub fn received(&self) -> Vec<String> {
        self.state.received.lock().unwrap().clone()
    }

    pub fn ws_attempts(&self) -> usize {
        self.state.ws_attempts.load(Ordering::SeqCst)
    }

    pub fn poll_requests(&self) -> usize {
        self.state.poll_requests.load(Ordering::SeqCst)
    }

    /// Sends a server disconnect (`41`) to every client each `period`.
    pub fn kick_clients_every(&self, period: Duration) {
        let push = self.state.push.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let _ = push.send("41".to_string());
            }
        });
    }
}

async fn system_stats(State(state): State<Arc<BackendState>>) -> Response {
    state.poll_requests.fetch_add(1, Ordering::SeqCst);
    let delay = state.system_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let status = state.system_status.load(Ordering::SeqCst);
    if status != 200 {
        let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (code, Json(json!({"error": "collection failed"}))).into_response();
    }
    Json(state.system.lock().unwrap().clone()).into_response()
}

async fn dns_stats(State(state): State<Arc<BackendState>>) -> Json<Value> {
    Json(state.dns.lock().unwrap().clone())
}

async fn socket(ws: WebSocketUpgrade, State(state): State<Arc<BackendState>>) -> Response {
    state.ws_attempts.fetch_add(1, Ordering::SeqCst);
    if !state.ws_enabled.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    if state.ws_silent.load(Ordering::SeqCst) {
        return ws.on_upgrade(|mut socket| async move {
            while let Some(Ok(_)) = socket.recv().await {}
        });
    }
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: Arc<BackendState>) {
    let mut push = state.push.subscribe();
    let open = open_packet(
        state.ping_interval_ms.load(Ordering::SeqCst),
        state.ping_timeout_ms.load(Ordering::SeqCst),
    );
    if socket.send(Message::Text(open.into())).await.is_err() {
        return;
    }
    loop {
        tokio::select! {
            frame = socket.recv() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let text = text.as_str();
                    if text.starts_with("40") {
                        let ack = Message::Text(r#"40{"sid":"fake-socket"}"#.into());
                        if socket.send(ack).await.is_err() {
                            return;
                        }
                    } else {
                        state.received.lock().unwrap().push(text.to_string());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return,
            },
            frame = push.recv() => match frame {
                Ok(frame) => {
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
                Err(_) => return,
            },
        }
    }
}

pub fn system_json(cpu_percent: f64) -> Value {
    json!({
        "cpu": {"percent": cpu_percent, "count": 8, "frequency": {"current": 2400.0}},
        "memory": {"total": 17_179_869_184u64, "used": 8_589_934_592u64, "percent": 50.0},
        "disk": {"total": 500_000_000_000u64, "used": 200_000_000_000u64, "percent": 40.0},
        "network": {"bytes_sent": 1000, "bytes_recv": 2000, "speed": {"upload": 512.0, "download": 2048.0}},
        "load_average": {"1min": 0.5, "5min": 0.4, "15min": 0.3},
        "uptime": {"seconds": 90061}
    })
}

pub fn dns_json() -> Value {
    json!({
        "bind_status": {
            "process_running": true,
            "service_status": {"active": true},
            "config_status": {"valid": true},
            "version": "BIND 9.18.24"
        },
        "query_stats": {"total_queries": 1234, "qps": 2.5, "queries_per_minute": 150, "queries_per_hour": 9000},
        "recent_queries": [
            {"timestamp": "2024-05-01T10:00:02", "client_ip": "10.0.0.2", "domain": "b.example", "query_type": "AAAA", "response_time": 3},
            {"timestamp": "2024-05-01T10:00:01", "client_ip": "10.0.0.1", "domain": "a.example", "query_type": "A"}
        ],
        "query_types": {"A": {"count": 10, "percentage": 66.7}, "AAAA": {"count": 5, "percentage": 33.3}},
        "response_times": {"average": 12.5, "min": 1.0, "max": 40.0},
        "top_domains": [{"domain": "a.example", "count": 7}],
        "service_health": {"status": "healthy", "issues": []}
    })
}

/// Defaults pointed at `base_url`, with retry and poll timings shrunk for tests.
pub fn fast_config(base_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.server.base_url = base_url.to_string();
    config.push.connect_timeout_ms = 1_000;
    config.push.reconnect_delay_ms = 5;
    config.push.reconnect_delay_max_ms = 10;
    config.poll.interval_ms = 50;
    config.poll.timeout_ms = 1_000;
    config
}

pub fn channel(config: &AppConfig) -> TransportChannel {
    TransportChannel::new(TransportConfig::from_app(config)).unwrap()
}

/// A base URL nothing listens on.
pub async fn closed_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Drives the channel until `pred` matches, returning every event seen.
pub async fn events_until(
    channel: &mut TransportChannel,
    within: Duration,
    mut pred: impl FnMut(&TransportEvent) -> bool,
) -> Vec<TransportEvent> {
    let deadline = Instant::now() + within;
    let mut seen = Vec::new();
    loop {
        let event = timeout_at(deadline, channel.next_event())
            .await
            .unwrap_or_else(|_| panic!("timed out; events so far: {seen:#?}"));
        let done = pred(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Drives the channel for `period`, returning whatever arrived.
pub async fn drain_for(channel: &mut TransportChannel, period: Duration) -> Vec<TransportEvent> {
    let deadline = Instant::now() + period;
    let mut seen = Vec::new();
    while let Ok(event) = timeout_at(deadline, channel.next_event()).await {
        seen.push(event);
    }
    seen
}

/// Polls `check` until it holds or `within` elapses.
pub async fn wait_for(within: Duration, mut check: impl FnMut() -> bool) -> bool {
    timeout(within, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}

#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub snapshots: Vec<SnapshotView>,
    pub queries: Vec<QueryRecord>,
    pub states: Vec<ConnectionState>,
    pub alerts: Vec<AlertData>,
    pub statuses: Vec<String>,
    pub errors: Vec<String>,
    pub ticks: usize,
}

impl Renderer for RecordingRenderer {
    fn on_snapshot(&mut self, view: &SnapshotView) {
        self.snapshots.push(view.clone());
    }

    fn on_query_appended(&mut self, record: &QueryRecord) {
        self.queries.push(record.clone());
    }

    fn on_connection_state_changed(&mut self, state: &ConnectionState) {
        self.states.push(state.clone());
    }

    fn on_alert(&mut self, alert: &AlertData) {
        self.alerts.push(alert.clone());
    }

    fn on_status_message(&mut self, message: &str) {
        self.statuses.push(message.to_string());
    }

    fn on_transient_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn on_clock_tick(&mut self, _now: DateTime<Local>) {
        self.ticks += 1;
    }
}
