// Display formatting for raw telemetry: sizes, rates, durations, timestamps

use chrono::{DateTime, Local, TimeZone, Utc};

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const RATE_UNITS: [&str; 5] = ["B/s", "KB/s", "MB/s", "GB/s", "TB/s"];

/// `1536` -> `"1.5 KB"`. Binary (1024) steps, at most two decimals,
/// trailing zeros dropped.
pub fn format_bytes(bytes: u64) -> String {
    scaled(bytes as f64, &BYTE_UNITS, 2)
}

/// Bytes per second -> `"1.5 KB/s"`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    scaled(bytes_per_sec, &RATE_UNITS, 2)
}

fn scaled(value: f64, units: &[&str], decimals: usize) -> String {
    if !value.is_finite() || value <= 0.0 {
        return format!("0 {}", units[0]);
    }
    let mut n = value;
    let mut exp = 0;
    while n >= 1024.0 && exp < units.len() - 1 {
        n /= 1024.0;
        exp += 1;
    }
    format!("{} {}", trim_decimals(n, decimals), units[exp])
}

/// Fixed decimals with trailing zeros removed: `1.50` -> `1.5`, `2.00` -> `2`.
pub fn trim_decimals(value: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// `93784` -> `"1d 2h 3m"`; drops to `"2h 3m"`, `"3m 4s"`, `"4s"` as it shrinks.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Query response time cell: `"12ms"`, or `"N/A"` when not reported.
pub fn format_response_time(ms: Option<f64>) -> String {
    match ms {
        Some(ms) if ms > 0.0 => format!("{}ms", trim_decimals(ms, 2)),
        _ => "N/A".to_string(),
    }
}

/// CPU frequency in MHz -> `"2.40 GHz"`.
pub fn format_frequency(mhz: f64) -> String {
    format!("{:.2} GHz", mhz.max(0.0) / 1000.0)
}

/// Wall clock as `HH:MM:SS`, 24h.
pub fn format_clock<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%H:%M:%S").to_string()
}

/// Full local timestamp, `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Relative age: `"42s ago"`, `"5m ago"`, `"3h ago"`, `"2d ago"`.
/// Future timestamps read as `"0s ago"`.
pub fn time_ago(then: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let secs = (*now - *then).num_seconds().max(0);
    let (minutes, hours, days) = (secs / 60, secs / 3_600, secs / 86_400);
    if days > 0 {
        format!("{days}d ago")
    } else if hours > 0 {
        format!("{hours}h ago")
    } else if minutes > 0 {
        format!("{minutes}m ago")
    } else {
        format!("{secs}s ago")
    }
}

/// Coarse severity band used for gauges and cell highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Low,
    Moderate,
    High,
    Critical,
}

/// Usage percentage band: >=90 critical, >=75 high, >=50 moderate.
pub fn usage_level(percent: f64) -> Level {
    if percent >= 90.0 {
        Level::Critical
    } else if percent >= 75.0 {
        Level::High
    } else if percent >= 50.0 {
        Level::Moderate
    } else {
        Level::Low
    }
}

/// Response time band in ms: >=1000 critical, >=500 high, >=100 moderate.
pub fn response_time_level(ms: f64) -> Level {
    if ms >= 1000.0 {
        Level::Critical
    } else if ms >= 500.0 {
        Level::High
    } else if ms >= 100.0 {
        Level::Moderate
    } else {
        Level::Low
    }
}
