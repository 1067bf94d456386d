// Single source of truth for the current monitoring state.
// Every write builds a new Snapshot from a copy and swaps the Arc, so readers
// only ever see fully merged values.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::models::{
    DnsPatch, QueryRecord, ResponseTimeSample, Snapshot, SnapshotPatch, SystemPatch,
};

/// Rolling buffers derived from the current snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    /// Oldest first, as a chart plots them.
    pub response_time_series: Vec<ResponseTimeSample>,
    /// Newest first.
    pub recent_queries: Vec<QueryRecord>,
}

#[derive(Debug)]
pub struct StateStore {
    current: Arc<Snapshot>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Snapshot::empty(Utc::now())),
        }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current)
    }

    pub fn history(&self) -> History {
        History {
            response_time_series: self.current.dns.response_time_series.to_vec(),
            recent_queries: self.current.recent_queries(),
        }
    }

    /// Merges the sections the patch carries; omitted sections keep their values.
    pub fn apply_snapshot(&mut self, patch: &SnapshotPatch) -> Arc<Snapshot> {
        self.update(|next| {
            if let Some(system) = &patch.system {
                merge_system(next, system);
            }
            if let Some(dns) = &patch.dns {
                merge_dns(next, dns);
            }
            next.received_at = patch.received_at;
        })
    }

    /// Newest first; the oldest record falls off past capacity.
    pub fn append_query(&mut self, record: QueryRecord) -> Arc<Snapshot> {
        self.update(|next| {
            next.dns.recent_queries.push(record);
        })
    }

    pub fn append_response_time_sample(
        &mut self,
        timestamp: DateTime<Utc>,
        avg_ms: f64,
    ) -> Arc<Snapshot> {
        self.update(|next| {
            next.dns
                .response_time_series
                .push(ResponseTimeSample { timestamp, avg_ms });
        })
    }

    pub fn clear_queries(&mut self) -> Arc<Snapshot> {
        self.update(|next| next.dns.recent_queries.clear())
    }

    /// Back to an empty baseline (full resync).
    pub fn reset(&mut self) -> Arc<Snapshot> {
        self.current = Arc::new(Snapshot::empty(Utc::now()));
        self.current()
    }

    fn update(&mut self, f: impl FnOnce(&mut Snapshot)) -> Arc<Snapshot> {
        let mut next = Snapshot::clone(&self.current);
        f(&mut next);
        self.current = Arc::new(next);
        self.current()
    }
}

fn merge_system(snapshot: &mut Snapshot, patch: &SystemPatch) {
    let system = &mut snapshot.system;
    if let Some(cpu) = patch.cpu {
        system.cpu = cpu;
    }
    if let Some(memory) = patch.memory {
        system.memory = memory;
    }
    if let Some(disk) = patch.disk {
        system.disk = disk;
    }
    if let Some(network) = patch.network {
        system.network = network;
    }
    if let Some(load) = patch.load {
        system.load = load;
    }
    if let Some(uptime) = patch.uptime_seconds {
        system.uptime_seconds = uptime;
    }
}

fn merge_dns(snapshot: &mut Snapshot, patch: &DnsPatch) {
    let dns = &mut snapshot.dns;
    if let Some(status) = &patch.service_status {
        dns.service_status = status.clone();
    }
    if let Some(stats) = patch.query_stats {
        dns.query_stats = stats;
    }
    if let Some(queries) = &patch.recent_queries {
        dns.recent_queries.replace_newest_first(queries.iter().cloned());
    }
    if let Some(types) = &patch.query_type_counts {
        dns.query_type_counts = types.clone();
    }
    if let Some(times) = patch.response_times {
        dns.response_times = times;
    }
    if let Some(top) = &patch.top_domains {
        dns.top_domains = top.clone();
    }
    if let Some(health) = &patch.service_health {
        dns.service_health = health.clone();
    }
}
