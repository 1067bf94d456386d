// Domain models: backend JSON decoded leniently into zero-defaulted sections

mod dns;
mod lenient;
mod snapshot;
mod system;
mod window;

use serde::{Deserialize, Serialize};

pub use dns::{
    DomainCount, QueryRecord, QueryStats, QueryTypeCounts, QueryTypeShare, ResponseTimeSample,
    ResponseTimes, ServiceHealth, ServiceStatus,
};
pub use snapshot::{
    DnsPatch, DnsStats, RECENT_QUERIES_CAPACITY, RESPONSE_TIME_SERIES_CAPACITY, Snapshot,
    SnapshotPatch, SystemPatch,
};
pub use system::{CpuStats, LoadAverage, NetworkStats, SystemStats, UsageStats};
pub use window::RollingWindow;

/// `system_alert{title, message}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

/// `status{message}` and `error{message}` bodies.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct MessageBody {
    #[serde(default)]
    pub(crate) message: String,
}
