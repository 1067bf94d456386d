// Snapshot (current monitoring state) and partial updates (patches)

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::dns::{
    DomainCount, QueryRecord, QueryStats, QueryTypeCounts, ResponseTimeSample, ResponseTimes,
    ServiceHealth, ServiceStatus,
};
use super::lenient::section;
use super::system::{CpuStats, LoadAverage, NetworkStats, SystemStats, UptimeWire, UsageStats};
use super::window::RollingWindow;

/// Capacity of the recent-query log.
pub const RECENT_QUERIES_CAPACITY: usize = 50;
/// Capacity of the response-time chart series.
pub const RESPONSE_TIME_SERIES_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DnsStats {
    pub service_status: ServiceStatus,
    pub query_stats: QueryStats,
    /// Exposed newest-first through `Snapshot::recent_queries`.
    pub recent_queries: RollingWindow<QueryRecord>,
    pub query_type_counts: QueryTypeCounts,
    pub response_times: ResponseTimes,
    pub response_time_series: RollingWindow<ResponseTimeSample>,
    pub top_domains: Vec<DomainCount>,
    pub service_health: ServiceHealth,
}

impl Default for DnsStats {
    fn default() -> Self {
        Self {
            service_status: ServiceStatus::default(),
            query_stats: QueryStats::default(),
            recent_queries: RollingWindow::new(RECENT_QUERIES_CAPACITY),
            query_type_counts: QueryTypeCounts::new(),
            response_times: ResponseTimes::default(),
            response_time_series: RollingWindow::new(RESPONSE_TIME_SERIES_CAPACITY),
            top_domains: Vec::new(),
            service_health: ServiceHealth::default(),
        }
    }
}

/// A complete, consistent point-in-time view of every monitored section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub system: SystemStats,
    pub dns: DnsStats,
    pub received_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty(received_at: DateTime<Utc>) -> Self {
        Self {
            system: SystemStats::default(),
            dns: DnsStats::default(),
            received_at,
        }
    }

    pub fn recent_queries(&self) -> Vec<QueryRecord> {
        self.dns.recent_queries.to_vec_newest_first()
    }
}

/// System sections present in one update. `None` means "not sent".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemPatch {
    pub cpu: Option<CpuStats>,
    pub memory: Option<UsageStats>,
    pub disk: Option<UsageStats>,
    pub network: Option<NetworkStats>,
    pub load: Option<LoadAverage>,
    pub uptime_seconds: Option<u64>,
}

impl SystemPatch {
    /// Decodes the backend's `system` object. Returns `None` when nothing
    /// usable is present (missing, malformed or an error marker).
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let patch = Self {
            cpu: section(obj.get("cpu")),
            memory: section(obj.get("memory")),
            disk: section(obj.get("disk")),
            network: section(obj.get("network")),
            load: section(obj.get("load_average")),
            uptime_seconds: section::<UptimeWire>(obj.get("uptime")).map(|u| u.seconds),
        };
        (!patch.is_empty()).then_some(patch)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// DNS sections present in one update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DnsPatch {
    pub service_status: Option<ServiceStatus>,
    pub query_stats: Option<QueryStats>,
    /// Newest-first, as the server sends it.
    pub recent_queries: Option<Vec<QueryRecord>>,
    pub query_type_counts: Option<QueryTypeCounts>,
    pub response_times: Option<ResponseTimes>,
    pub top_domains: Option<Vec<DomainCount>>,
    pub service_health: Option<ServiceHealth>,
}

impl DnsPatch {
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let patch = Self {
            service_status: section(obj.get("bind_status")),
            query_stats: section(obj.get("query_stats")),
            recent_queries: list(obj.get("recent_queries")),
            query_type_counts: section(obj.get("query_types")),
            response_times: section(obj.get("response_times")),
            top_domains: list(obj.get("top_domains")),
            service_health: section(obj.get("service_health")),
        };
        (!patch.is_empty()).then_some(patch)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Decodes an array section, dropping malformed elements.
fn list<T: serde::de::DeserializeOwned>(value: Option<&Value>) -> Option<Vec<T>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect(),
    )
}

/// A partial update naming only the sections it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPatch {
    pub system: Option<SystemPatch>,
    pub dns: Option<DnsPatch>,
    pub received_at: DateTime<Utc>,
}

impl SnapshotPatch {
    pub fn new(received_at: DateTime<Utc>) -> Self {
        Self {
            system: None,
            dns: None,
            received_at,
        }
    }

    /// Builds a patch from the raw `system` / `dns` payloads (push event
    /// body or the two poll responses).
    pub fn from_parts(
        system: Option<&Value>,
        dns: Option<&Value>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            system: system.and_then(SystemPatch::from_value),
            dns: dns.and_then(DnsPatch::from_value),
            received_at,
        }
    }

    /// `monitoring_data{timestamp, system, dns}`.
    pub fn from_monitoring_data(data: &Value, received_at: DateTime<Utc>) -> Self {
        Self::from_parts(data.get("system"), data.get("dns"), received_at)
    }

    pub fn with_system(mut self, system: SystemPatch) -> Self {
        self.system = Some(system);
        self
    }

    pub fn with_dns(mut self, dns: DnsPatch) -> Self {
        self.dns = Some(dns);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.system.is_none() && self.dns.is_none()
    }

    /// Average response time carried by this update, if any.
    pub fn response_time_average(&self) -> Option<f64> {
        self.dns
            .as_ref()
            .and_then(|d| d.response_times)
            .map(|r| r.average)
    }
}
