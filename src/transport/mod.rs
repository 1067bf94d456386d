// Transport channel: push session with reconnect/backoff, pull fallback.
// All state is owned here and mutated only from `next_event` and the
// command methods, on the caller's task.

mod machine;
mod poll;
mod push;

use chrono::Utc;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::TransportError;
use crate::models::{AlertData, QueryRecord, SnapshotPatch};
use crate::protocol::{self, InboundEvent};

pub use machine::{AfterFailure, Backoff, ConnectionMachine, ConnectionState, Phase};
pub use poll::{DNS_STATS_PATH, PollOutcome, Poller, SYSTEM_STATS_PATH};
pub use push::DisconnectReason;

use push::{PushSession, PushSignal};

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub push_enabled: bool,
    pub connect_timeout: Duration,
    pub backoff: Backoff,
    pub max_attempts: u32,
    pub queue_capacity: usize,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl TransportConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url().to_string(),
            push_enabled: config.push.enabled,
            connect_timeout: Duration::from_millis(config.push.connect_timeout_ms),
            backoff: Backoff {
                initial: Duration::from_millis(config.push.reconnect_delay_ms),
                max: Duration::from_millis(config.push.reconnect_delay_max_ms),
            },
            max_attempts: config.push.max_reconnect_attempts,
            queue_capacity: config.push.outbound_queue_capacity,
            poll_interval: Duration::from_millis(config.poll.interval_ms),
            poll_timeout: Duration::from_millis(config.poll.timeout_ms),
        }
    }

    /// `http(s)://host` becomes `ws(s)://host/socket.io/...`.
    pub fn push_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let rest = base
            .strip_prefix("http")
            .map(|r| format!("ws{r}"))
            .unwrap_or_else(|| base.to_string());
        format!("{rest}{}", protocol::SOCKET_PATH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Push,
    Poll,
}

/// Everything the channel reports, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected(DisconnectReason),
    Data {
        patch: SnapshotPatch,
        source: DataSource,
    },
    QueryEvent(QueryRecord),
    Alert(AlertData),
    Status(String),
    /// Server-side `error` event.
    ServerError(String),
    Resync,
    StateChanged(ConnectionState),
    PollFailed(TransportError),
}

/// Raw outcome reported by an I/O task.
#[derive(Debug)]
pub(crate) enum Signal {
    Push { session: u64, signal: PushSignal },
    Poll(PollOutcome),
}

pub struct TransportChannel {
    config: TransportConfig,
    push_url: String,
    machine: ConnectionMachine,
    poller: Poller,
    signals_tx: mpsc::UnboundedSender<Signal>,
    signals_rx: mpsc::UnboundedReceiver<Signal>,
    session: Option<PushSession>,
    next_session: u64,
    outbound: VecDeque<String>,
    pending: VecDeque<TransportEvent>,
    retry_at: Option<Instant>,
    poll_timer: Option<Interval>,
    poll_in_flight: bool,
    polling_suspended: bool,
    stopped: bool,
}

impl TransportChannel {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let poller = Poller::new(&config.base_url, config.poll_timeout)?;
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        Ok(Self {
            push_url: config.push_url(),
            machine: ConnectionMachine::new(config.max_attempts, config.backoff),
            poller,
            signals_tx,
            signals_rx,
            session: None,
            next_session: 0,
            outbound: VecDeque::with_capacity(config.queue_capacity),
            pending: VecDeque::new(),
            retry_at: None,
            poll_timer: None,
            poll_in_flight: false,
            polling_suspended: false,
            stopped: false,
            config,
        })
    }

    pub fn state(&self) -> &ConnectionState {
        self.machine.state()
    }

    pub fn is_live(&self) -> bool {
        self.machine.state().is_live()
    }

    /// True while the poll timer is armed.
    pub fn is_polling(&self) -> bool {
        self.poll_timer.is_some()
    }

    /// Messages waiting for the next push session.
    pub fn queued_len(&self) -> usize {
        self.outbound.len()
    }

    /// Starts a new connect cycle with a fresh attempt counter. No-op while Live.
    pub fn connect(&mut self) {
        self.stopped = false;
        if self.is_live() {
            debug!("connect requested while live, ignoring");
            return;
        }
        if !self.config.push_enabled {
            let changed = self.machine.go_offline();
            self.emit_state(changed);
            self.update_polling();
            return;
        }
        self.session = None;
        self.retry_at = None;
        let changed = self.machine.begin_cycle();
        self.emit_state(changed);
        self.update_polling();
        self.start_attempt();
    }

    /// Closes push and stops polling until the next `connect`.
    pub fn disconnect(&mut self) {
        self.stopped = true;
        self.retry_at = None;
        let was_live = self.is_live();
        if let Some(session) = self.session.take() {
            session.close();
        }
        if was_live {
            self.pending
                .push_back(TransportEvent::Disconnected(DisconnectReason::ClientDisconnect));
        }
        let changed = self.machine.go_offline();
        self.emit_state(changed);
        self.update_polling();
    }

    /// Delivers immediately while Live, otherwise queues (oldest dropped at
    /// capacity) until the next session opens.
    pub fn send(&mut self, event: &str, payload: Option<&Value>) {
        let frame = protocol::encode_event(event, payload);
        let frame = match (&self.session, self.is_live()) {
            (Some(session), true) => match session.send(frame) {
                Ok(()) => return,
                Err(frame) => frame,
            },
            _ => frame,
        };
        self.outbound.push_back(frame);
        if self.outbound.len() > self.config.queue_capacity {
            self.outbound.pop_front();
            warn!(
                capacity = self.config.queue_capacity,
                operation = "send",
                "outbound queue full, dropped oldest message"
            );
        }
    }

    pub fn suspend_polling(&mut self) {
        self.polling_suspended = true;
        self.update_polling();
    }

    pub fn resume_polling(&mut self) {
        self.polling_suspended = false;
        self.update_polling();
    }

    /// Host lost connectivity: drop push, go Offline with polling armed.
    pub fn network_offline(&mut self) {
        self.retry_at = None;
        let was_live = self.is_live();
        self.session = None;
        if was_live {
            self.pending
                .push_back(TransportEvent::Disconnected(DisconnectReason::NetworkOffline));
        }
        let changed = self.machine.go_offline();
        self.emit_state(changed);
        self.update_polling();
    }

    /// Host regained connectivity: forced reconnect.
    pub fn network_online(&mut self) {
        self.connect();
    }

    /// One poll cycle now, independent of the timer.
    pub fn poll_now(&mut self) {
        self.spawn_poll();
    }

    /// Next event in arrival order. Cancel-safe.
    pub async fn next_event(&mut self) -> TransportEvent {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return event;
            }
            tokio::select! {
                signal = self.signals_rx.recv() => {
                    if let Some(signal) = signal {
                        self.handle_signal(signal);
                    }
                }
                _ = sleep_until_opt(self.retry_at) => {
                    self.retry_at = None;
                    self.start_attempt();
                }
                _ = tick_opt(&mut self.poll_timer) => self.spawn_poll(),
            }
        }
    }

    fn start_attempt(&mut self) {
        self.next_session += 1;
        debug!(
            session = self.next_session,
            attempt = self.machine.state().reconnect_attempts + 1,
            url = %self.push_url,
            "push connect attempt"
        );
        self.session = Some(push::spawn(
            self.next_session,
            self.push_url.clone(),
            self.config.connect_timeout,
            self.signals_tx.clone(),
        ));
    }

    fn spawn_poll(&mut self) {
        if self.poll_in_flight {
            debug!("poll already in flight, skipping");
            return;
        }
        self.poll_in_flight = true;
        let poller = self.poller.clone();
        let tx = self.signals_tx.clone();
        tokio::spawn(async move {
            let outcome = poller.fetch().await;
            let _ = tx.send(Signal::Poll(outcome));
        });
    }

    fn update_polling(&mut self) {
        let wanted =
            !self.stopped && !self.polling_suspended && self.machine.state().wants_polling();
        match (wanted, self.poll_timer.is_some()) {
            (true, false) => {
                // While a push attempt is under way the first tick waits a period.
                let start = match self.machine.state().phase {
                    Phase::Connecting => Instant::now() + self.config.poll_interval,
                    _ => Instant::now(),
                };
                let mut timer = interval_at(start, self.config.poll_interval);
                timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.poll_timer = Some(timer);
                info!(
                    interval_ms = self.config.poll_interval.as_millis() as u64,
                    "polling started"
                );
            }
            (false, true) => {
                self.poll_timer = None;
                info!("polling stopped");
            }
            _ => {}
        }
    }

    fn emit_state(&mut self, changed: Option<ConnectionState>) {
        if let Some(state) = changed {
            self.pending.push_back(TransportEvent::StateChanged(state));
        }
    }

    fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Push { session, signal } => {
                if self.session.as_ref().map(|s| s.id) != Some(session) {
                    debug!(session, "dropping signal from superseded push session");
                    return;
                }
                self.handle_push(signal);
            }
            Signal::Poll(outcome) => self.handle_poll(outcome),
        }
    }

    fn handle_push(&mut self, signal: PushSignal) {
        match signal {
            PushSignal::Opened => {
                info!("push connected");
                let changed = self.machine.push_opened(Utc::now());
                self.emit_state(changed);
                self.pending.push_back(TransportEvent::Connected);
                self.update_polling();
                self.flush_outbound();
            }
            PushSignal::Failed(e) => {
                self.session = None;
                let attempt = self.machine.state().reconnect_attempts + 1;
                warn!(error = %e, attempt, operation = "push_connect", "push connect failed");
                self.schedule_retry();
            }
            PushSignal::Inbound(event) => {
                let changed = self.machine.push_delivered();
                self.emit_state(changed);
                self.handle_inbound(event);
            }
            PushSignal::Closed(reason) => {
                self.session = None;
                info!(reason = %reason, "push disconnected");
                self.pending
                    .push_back(TransportEvent::Disconnected(reason.clone()));
                if self.stopped || reason == DisconnectReason::ClientDisconnect {
                    let changed = self.machine.go_offline();
                    self.emit_state(changed);
                    self.update_polling();
                } else {
                    self.schedule_retry();
                }
            }
        }
    }

    /// Counts the failed or lost attempt and arms the backoff timer, or gives
    /// up. The first failure of a cycle also polls at once.
    fn schedule_retry(&mut self) {
        let (after, changed) = self.machine.push_failed();
        let attempts = self.machine.state().reconnect_attempts;
        self.emit_state(changed);
        match after {
            AfterFailure::RetryAfter(delay) => {
                debug!(delay_ms = delay.as_millis() as u64, attempts, "push retry scheduled");
                self.retry_at = Some(Instant::now() + delay);
            }
            AfterFailure::GiveUp => {
                warn!(attempts, "push unavailable, falling back to polling");
            }
        }
        self.update_polling();
        if attempts == 1 && self.poll_timer.is_some() {
            self.spawn_poll();
        }
    }

    /// Queued frames in FIFO order, then the automatic snapshot request.
    fn flush_outbound(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        while let Some(frame) = self.outbound.pop_front() {
            if let Err(frame) = session.send(frame) {
                self.outbound.push_front(frame);
                return;
            }
        }
        let _ = session.send(protocol::encode_event(protocol::REQUEST_CURRENT_DATA, None));
    }

    fn handle_inbound(&mut self, event: InboundEvent) {
        let event = match event {
            InboundEvent::Status(message) => TransportEvent::Status(message),
            InboundEvent::MonitoringData(data) => {
                let patch = SnapshotPatch::from_monitoring_data(&data, Utc::now());
                if patch.is_empty() {
                    debug!("monitoring_data without usable sections");
                    return;
                }
                TransportEvent::Data {
                    patch,
                    source: DataSource::Push,
                }
            }
            InboundEvent::DnsQuery(payload) => match serde_json::from_value(payload) {
                Ok(record) => TransportEvent::QueryEvent(record),
                Err(e) => {
                    warn!(error = %e, operation = "dns_query", "dropping malformed query event");
                    return;
                }
            },
            InboundEvent::SystemAlert(alert) => TransportEvent::Alert(alert),
            InboundEvent::Error(message) => {
                warn!(message = %message, "server reported an error");
                TransportEvent::ServerError(message)
            }
            InboundEvent::Resync => TransportEvent::Resync,
            InboundEvent::Other(name) => {
                debug!(event = %name, "ignoring unknown push event");
                return;
            }
        };
        self.pending.push_back(event);
    }

    fn handle_poll(&mut self, outcome: PollOutcome) {
        self.poll_in_flight = false;
        let PollOutcome {
            system,
            dns,
            received_at,
        } = outcome;
        let (system, system_err) = split(system);
        let (dns, dns_err) = split(dns);
        for err in [system_err.clone(), dns_err.clone()].into_iter().flatten() {
            warn!(error = %err, operation = "poll", "poll request failed");
        }
        if let Some(err) = system_err.or(dns_err) {
            self.pending.push_back(TransportEvent::PollFailed(err));
        }
        if system.is_none() && dns.is_none() {
            return;
        }
        if !self.stopped {
            let changed = self.machine.poll_succeeded(received_at);
            self.emit_state(changed);
        }
        let patch = SnapshotPatch::from_parts(system.as_ref(), dns.as_ref(), received_at);
        self.pending.push_back(TransportEvent::Data {
            patch,
            source: DataSource::Poll,
        });
    }
}

fn split(result: Result<Value, TransportError>) -> (Option<Value>, Option<TransportError>) {
    match result {
        Ok(v) => (Some(v), None),
        Err(e) => (None, Some(e)),
    }
}

async fn sleep_until_opt(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn tick_opt(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
