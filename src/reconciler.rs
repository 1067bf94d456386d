// Controller loop: routes transport events into the store, applies user and
// host triggers, and notifies the Renderer. The only writer of the store.

use chrono::Local;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, instrument};

use crate::models::QueryRecord;
use crate::prefs::{Preferences, PrefsStore};
use crate::protocol::{PAUSE_UPDATES, REQUEST_CURRENT_DATA, RESUME_UPDATES};
use crate::render::{Renderer, SnapshotView};
use crate::status::StatusReport;
use crate::store::StateStore;
use crate::transport::{TransportChannel, TransportEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `true` when the view becomes visible again.
    Visibility(bool),
    NetworkOnline,
    NetworkOffline,
    TogglePause,
    Refresh,
    ClearQueries,
    Shutdown,
}

pub struct Reconciler<R: Renderer> {
    transport: TransportChannel,
    store: StateStore,
    renderer: R,
    prefs: PrefsStore,
    paused: bool,
    visible: bool,
    clock_interval: Duration,
}

impl<R: Renderer> Reconciler<R> {
    pub fn new(transport: TransportChannel, renderer: R, prefs: PrefsStore) -> Self {
        let paused = prefs.load_or_default().queries_paused;
        Self {
            transport,
            store: StateStore::new(),
            renderer,
            prefs,
            paused,
            visible: true,
            clock_interval: Duration::from_secs(1),
        }
    }

    pub fn with_clock_interval(mut self, clock_interval: Duration) -> Self {
        self.clock_interval = clock_interval;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn transport(&self) -> &TransportChannel {
        &self.transport
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn start(&mut self) {
        info!(paused = self.paused, "starting live client");
        self.transport.connect();
    }

    /// Runs until `Shutdown` or the command channel closes, then hands the
    /// Renderer back.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> R {
        self.start();
        let mut clock = interval(self.clock_interval);
        clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                event = self.transport.next_event() => self.handle_event(event),
                command = commands.recv() => {
                    let command = command.unwrap_or(Command::Shutdown);
                    if self.handle_command(command).is_break() {
                        break;
                    }
                }
                _ = clock.tick() => self.renderer.on_clock_tick(Local::now()),
            }
        }
        self.renderer
    }

    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                if !self.visible {
                    self.transport.send(PAUSE_UPDATES, None);
                }
            }
            TransportEvent::Disconnected(reason) => {
                self.renderer
                    .on_status_message(&format!("disconnected: {reason}"));
            }
            TransportEvent::Data { patch, source } => {
                debug!(?source, "merging update");
                self.store.apply_snapshot(&patch);
                if let Some(avg) = patch.response_time_average() {
                    self.store
                        .append_response_time_sample(patch.received_at, avg);
                }
                self.render_snapshot();
            }
            TransportEvent::QueryEvent(record) => self.append_query(record),
            TransportEvent::Alert(alert) => self.renderer.on_alert(&alert),
            TransportEvent::Status(message) => self.renderer.on_status_message(&message),
            TransportEvent::ServerError(message) => self.renderer.on_transient_error(&message),
            TransportEvent::Resync => {
                info!("server requested resync");
                self.store.reset();
                self.render_snapshot();
                self.request_fresh();
            }
            TransportEvent::StateChanged(state) => {
                self.renderer.on_connection_state_changed(&state)
            }
            TransportEvent::PollFailed(e) => self.renderer.on_transient_error(&e.to_string()),
        }
    }

    #[instrument(skip(self))]
    pub fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Visibility(false) => {
                self.visible = false;
                self.transport.suspend_polling();
                // A session opened while hidden is paused on `Connected`.
                if self.transport.is_live() {
                    self.transport.send(PAUSE_UPDATES, None);
                }
            }
            Command::Visibility(true) => {
                self.visible = true;
                self.transport.resume_polling();
                self.transport.send(RESUME_UPDATES, None);
                if !self.transport.is_live() {
                    self.transport.connect();
                }
                self.request_fresh();
            }
            Command::NetworkOnline => self.transport.network_online(),
            Command::NetworkOffline => self.transport.network_offline(),
            Command::TogglePause => {
                self.paused = !self.paused;
                self.prefs.save_or_log(&Preferences {
                    queries_paused: self.paused,
                });
                if !self.paused {
                    self.render_snapshot();
                }
            }
            Command::Refresh => self.request_fresh(),
            Command::ClearQueries => {
                self.store.clear_queries();
                self.render_snapshot();
            }
            Command::Shutdown => {
                self.transport.disconnect();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn append_query(&mut self, record: QueryRecord) {
        self.store.append_query(record.clone());
        if !self.paused {
            self.renderer.on_query_appended(&record);
        }
    }

    /// Snapshot request over push when Live, otherwise an immediate poll.
    fn request_fresh(&mut self) {
        if self.transport.is_live() {
            self.transport.send(REQUEST_CURRENT_DATA, None);
        } else {
            self.transport.poll_now();
        }
    }

    fn render_snapshot(&mut self) {
        let snapshot = self.store.current();
        let view = SnapshotView {
            status: StatusReport::from_snapshot(&snapshot),
            query_table: (!self.paused).then(|| snapshot.recent_queries()),
            snapshot,
        };
        self.renderer.on_snapshot(&view);
    }
}
