// Presentation seam: the core hands plain data to a Renderer

use chrono::{DateTime, Local, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::format::{
    format_bytes, format_clock, format_frequency, format_rate, format_response_time,
    format_timestamp, format_uptime, response_time_level, time_ago, trim_decimals, usage_level,
};
use crate::models::{AlertData, QueryRecord, Snapshot};
use crate::status::StatusReport;
use crate::transport::ConnectionState;

/// What a Renderer receives on every state update.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotView {
    pub snapshot: Arc<Snapshot>,
    pub status: StatusReport,
    /// Newest first. `None` while the query table is paused.
    pub query_table: Option<Vec<QueryRecord>>,
}

pub trait Renderer {
    fn on_snapshot(&mut self, view: &SnapshotView);
    fn on_query_appended(&mut self, record: &QueryRecord);
    fn on_connection_state_changed(&mut self, state: &ConnectionState);
    fn on_alert(&mut self, alert: &AlertData);

    fn on_status_message(&mut self, _message: &str) {}

    /// Recoverable failures (a poll cycle, a server `error` event).
    fn on_transient_error(&mut self, _message: &str) {}

    fn on_clock_tick(&mut self, _now: DateTime<Local>) {}
}

/// Writes each update as a structured log line.
#[derive(Debug, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn on_snapshot(&mut self, view: &SnapshotView) {
        let system = &view.snapshot.system;
        let dns = &view.snapshot.dns;
        info!(
            cpu = %format!("{}% of {} cores @ {}", trim_decimals(system.cpu.percent, 1), system.cpu.cores, format_frequency(system.cpu.freq_mhz)),
            memory = %format!("{} / {}", format_bytes(system.memory.used_bytes), format_bytes(system.memory.total_bytes)),
            disk = %format!("{} / {}", format_bytes(system.disk.used_bytes), format_bytes(system.disk.total_bytes)),
            upload = %format_rate(system.network.upload_bps),
            download = %format_rate(system.network.download_bps),
            load = %format!("{:.2} {:.2} {:.2}", system.load.one, system.load.five, system.load.fifteen),
            uptime = %format_uptime(system.uptime_seconds),
            disk_level = ?usage_level(system.disk.percent),
            status = ?view.status,
            "system"
        );
        info!(
            version = %dns.service_status.version,
            qps = %trim_decimals(dns.query_stats.qps, 2),
            total = dns.query_stats.total_queries,
            avg_response = %format_response_time(Some(dns.response_times.average)),
            top_domain = dns.top_domains.first().map(|d| d.domain.as_str()).unwrap_or("-"),
            "dns"
        );
        if let Some(table) = &view.query_table {
            debug!(rows = table.len(), "query table");
        }
    }

    fn on_query_appended(&mut self, record: &QueryRecord) {
        info!(
            at = %format_timestamp(&record.timestamp),
            client = %record.client_ip,
            domain = %record.domain,
            query_type = %record.query_type,
            response_time = %format_response_time(record.response_time_ms),
            latency = ?record.response_time_ms.map(response_time_level),
            "query"
        );
    }

    fn on_connection_state_changed(&mut self, state: &ConnectionState) {
        let last_success = state
            .last_success_at
            .map(|t| time_ago(&t, &Utc::now()))
            .unwrap_or_else(|| "never".into());
        info!(
            phase = ?state.phase,
            attempts = state.reconnect_attempts,
            last_success = %last_success,
            "connection"
        );
    }

    fn on_alert(&mut self, alert: &AlertData) {
        warn!(title = %alert.title, "{}", alert.message);
    }

    fn on_status_message(&mut self, message: &str) {
        info!("{message}");
    }

    fn on_transient_error(&mut self, message: &str) {
        warn!("{message}");
    }

    fn on_clock_tick(&mut self, now: DateTime<Local>) {
        debug!(clock = %format_clock(&now), "tick");
    }
}
