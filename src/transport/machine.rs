// Connection state machine and reconnect backoff

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Push connection cycle in progress; polling covers the gap.
    Connecting,
    /// Push connected; polling suppressed.
    Live,
    /// Push given up; data arriving by polling.
    Degraded,
    /// Push given up (or host offline); no poll data yet.
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionState {
    pub phase: Phase,
    /// Push attempts in the current connect cycle that failed, or opened and
    /// then ended before delivering anything.
    pub reconnect_attempts: u32,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl ConnectionState {
    pub fn is_live(&self) -> bool {
        self.phase == Phase::Live
    }

    /// The poller runs whenever push is not Live.
    pub fn wants_polling(&self) -> bool {
        self.phase != Phase::Live
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            phase: Phase::Offline,
            reconnect_attempts: 0,
            last_success_at: None,
        }
    }
}

/// Exponential delay: `initial * 2^(attempt-1)`, capped at `max`, with
/// +/-25% jitter.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.clamp(1, 20) - 1;
        let base_ms = self.initial.as_millis() as u64;
        let exp = base_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(exp.min(self.max.as_millis() as u64))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let capped = self.base_delay(attempt).as_millis() as u64;
        let jitter = capped / 4;
        let offset = if jitter > 0 {
            (rand::random::<u64>() % (jitter * 2)) as i64 - jitter as i64
        } else {
            0
        };
        Duration::from_millis((capped as i64 + offset).max(1) as u64)
    }
}

/// What to do after a failed push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterFailure {
    RetryAfter(Duration),
    GiveUp,
}

/// Single owner of `ConnectionState`. Every method returns the new state when
/// it changed.
#[derive(Debug)]
pub struct ConnectionMachine {
    state: ConnectionState,
    max_attempts: u32,
    backoff: Backoff,
}

impl ConnectionMachine {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            state: ConnectionState::default(),
            max_attempts,
            backoff,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    fn set(&mut self, next: ConnectionState) -> Option<ConnectionState> {
        if next == self.state {
            None
        } else {
            self.state = next;
            Some(self.state.clone())
        }
    }

    /// New top-level connect cycle: resets the attempt counter.
    pub fn begin_cycle(&mut self) -> Option<ConnectionState> {
        self.set(ConnectionState {
            phase: Phase::Connecting,
            reconnect_attempts: 0,
            last_success_at: self.state.last_success_at,
        })
    }

    /// The attempt counter is kept until the session delivers something, so a
    /// server that drops every session still reaches the limit.
    pub fn push_opened(&mut self, now: DateTime<Utc>) -> Option<ConnectionState> {
        self.set(ConnectionState {
            phase: Phase::Live,
            reconnect_attempts: self.state.reconnect_attempts,
            last_success_at: Some(now),
        })
    }

    /// First inbound event on a Live session: the cycle succeeded.
    pub fn push_delivered(&mut self) -> Option<ConnectionState> {
        if !self.state.is_live() {
            return None;
        }
        self.set(ConnectionState {
            reconnect_attempts: 0,
            ..self.state.clone()
        })
    }

    /// Counts one failed attempt: a failed handshake or a lost session. At the
    /// limit the phase becomes Offline.
    pub fn push_failed(&mut self) -> (AfterFailure, Option<ConnectionState>) {
        let attempts = self.state.reconnect_attempts.saturating_add(1);
        if attempts >= self.max_attempts {
            let changed = self.set(ConnectionState {
                phase: Phase::Offline,
                reconnect_attempts: attempts,
                last_success_at: self.state.last_success_at,
            });
            (AfterFailure::GiveUp, changed)
        } else {
            let changed = self.set(ConnectionState {
                phase: Phase::Connecting,
                reconnect_attempts: attempts,
                last_success_at: self.state.last_success_at,
            });
            (AfterFailure::RetryAfter(self.backoff.delay(attempts)), changed)
        }
    }

    /// Push closed on purpose or the host went offline.
    pub fn go_offline(&mut self) -> Option<ConnectionState> {
        self.set(ConnectionState {
            phase: Phase::Offline,
            ..self.state.clone()
        })
    }

    /// A poll cycle delivered data. Never demotes a Live connection.
    pub fn poll_succeeded(&mut self, now: DateTime<Utc>) -> Option<ConnectionState> {
        match self.state.phase {
            Phase::Live | Phase::Connecting => None,
            Phase::Degraded | Phase::Offline => self.set(ConnectionState {
                phase: Phase::Degraded,
                reconnect_attempts: self.state.reconnect_attempts,
                last_success_at: Some(now),
            }),
        }
    }
}
