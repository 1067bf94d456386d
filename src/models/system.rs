// Host system sections: CPU, memory, disk, network, load, uptime

use serde::{Deserialize, Serialize};

use super::lenient::{f64_or_zero, object_or_none, u32_or_zero, u64_or_zero};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CpuWire")]
pub struct CpuStats {
    pub percent: f64,
    pub cores: u32,
    pub freq_mhz: f64,
}

#[derive(Deserialize)]
struct CpuWire {
    #[serde(default, deserialize_with = "f64_or_zero")]
    percent: f64,
    #[serde(default, deserialize_with = "u32_or_zero")]
    count: u32,
    #[serde(default, deserialize_with = "object_or_none")]
    frequency: Option<FrequencyWire>,
}

#[derive(Deserialize)]
struct FrequencyWire {
    #[serde(default, deserialize_with = "f64_or_zero")]
    current: f64,
}

impl From<CpuWire> for CpuStats {
    fn from(w: CpuWire) -> Self {
        Self {
            percent: w.percent,
            cores: w.count,
            freq_mhz: w.frequency.map(|f| f.current).unwrap_or(0.0),
        }
    }
}

/// Used/total for memory and the root disk; same wire shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "UsageWire")]
pub struct UsageStats {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent: f64,
}

#[derive(Deserialize)]
struct UsageWire {
    #[serde(default, deserialize_with = "u64_or_zero")]
    used: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    total: u64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    percent: f64,
}

impl From<UsageWire> for UsageStats {
    fn from(w: UsageWire) -> Self {
        Self {
            used_bytes: w.used,
            total_bytes: w.total,
            percent: w.percent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "NetworkWire")]
pub struct NetworkStats {
    pub upload_bps: f64,
    pub download_bps: f64,
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

#[derive(Deserialize)]
struct NetworkWire {
    #[serde(default, deserialize_with = "u64_or_zero")]
    bytes_sent: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    bytes_recv: u64,
    #[serde(default, deserialize_with = "object_or_none")]
    speed: Option<SpeedWire>,
}

#[derive(Deserialize)]
struct SpeedWire {
    #[serde(default, deserialize_with = "f64_or_zero")]
    upload: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    download: f64,
}

impl From<NetworkWire> for NetworkStats {
    fn from(w: NetworkWire) -> Self {
        let (upload_bps, download_bps) = w
            .speed
            .map(|s| (s.upload.max(0.0), s.download.max(0.0)))
            .unwrap_or((0.0, 0.0));
        Self {
            upload_bps,
            download_bps,
            bytes_sent: w.bytes_sent,
            bytes_recv: w.bytes_recv,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    #[serde(rename = "1min", default, deserialize_with = "f64_or_zero")]
    pub one: f64,
    #[serde(rename = "5min", default, deserialize_with = "f64_or_zero")]
    pub five: f64,
    #[serde(rename = "15min", default, deserialize_with = "f64_or_zero")]
    pub fifteen: f64,
}

#[derive(Deserialize)]
pub(crate) struct UptimeWire {
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub(crate) seconds: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SystemStats {
    pub cpu: CpuStats,
    pub memory: UsageStats,
    pub disk: UsageStats,
    pub network: NetworkStats,
    pub load: LoadAverage,
    pub uptime_seconds: u64,
}
