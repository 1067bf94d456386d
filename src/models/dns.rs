// DNS server sections: service status, query counters, query log, distributions

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::lenient::{
    bool_or_false, f64_or_zero, object_or_none, positive_f64, string_or_empty, u64_or_zero,
    vec_skip_invalid,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BindStatusWire")]
pub struct ServiceStatus {
    pub process_running: bool,
    pub service_active: bool,
    pub config_valid: bool,
    pub version: String,
}

impl ServiceStatus {
    /// Process up, service active and configuration valid.
    pub fn is_healthy(&self) -> bool {
        self.process_running && self.service_active && self.config_valid
    }
}

#[derive(Deserialize)]
struct BindStatusWire {
    #[serde(default, deserialize_with = "bool_or_false")]
    process_running: bool,
    #[serde(default, deserialize_with = "object_or_none")]
    service_status: Option<ActiveWire>,
    #[serde(default, deserialize_with = "object_or_none")]
    config_status: Option<ValidWire>,
    #[serde(default, deserialize_with = "string_or_empty")]
    version: String,
}

#[derive(Deserialize)]
struct ActiveWire {
    #[serde(default, deserialize_with = "bool_or_false")]
    active: bool,
}

#[derive(Deserialize)]
struct ValidWire {
    #[serde(default, deserialize_with = "bool_or_false")]
    valid: bool,
}

impl From<BindStatusWire> for ServiceStatus {
    fn from(w: BindStatusWire) -> Self {
        Self {
            process_running: w.process_running,
            service_active: w.service_status.is_some_and(|s| s.active),
            config_valid: w.config_status.is_some_and(|c| c.valid),
            version: w.version,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStats {
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub total_queries: u64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub qps: f64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub queries_per_minute: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub queries_per_hour: u64,
}

/// Latest server-side response-time aggregate, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseTimes {
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub average: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub min: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryTypeShare {
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub count: u64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub percentage: f64,
}

/// Query type (A, AAAA, MX, ...) to count and share.
pub type QueryTypeCounts = BTreeMap<String, QueryTypeShare>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainCount {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub domain: String,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "vec_skip_invalid")]
    pub issues: Vec<String>,
}

/// One DNS query as logged by the server. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    #[serde(default = "Utc::now", deserialize_with = "timestamp_or_now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub client_ip: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub domain: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub query_type: String,
    #[serde(
        rename = "response_time",
        default,
        deserialize_with = "positive_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_time_ms: Option<f64>,
}

/// One point of the response-time chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponseTimeSample {
    pub timestamp: DateTime<Utc>,
    pub avg_ms: f64,
}

/// Accepts RFC 3339, naive ISO-8601 (server local time, as Python's
/// `isoformat()` emits) or epoch milliseconds; anything else is "now".
fn timestamp_or_now<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(parse_timestamp(&value).unwrap_or_else(Utc::now))
}

pub(crate) fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok()?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        }
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn python_isoformat_timestamp_parses() {
        let v = serde_json::json!("2024-03-01T12:30:45.123456");
        let dt = parse_timestamp(&v).unwrap();
        assert_eq!(dt.with_timezone(&Local).year(), 2024);
    }

    #[test]
    fn epoch_millis_timestamp_parses() {
        let v = serde_json::json!(1_700_000_000_000i64);
        assert_eq!(parse_timestamp(&v).unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_timestamp(&serde_json::json!("yesterday")).is_none());
        assert!(parse_timestamp(&serde_json::json!(null)).is_none());
    }

    #[test]
    fn service_status_flattens_nested_flags() {
        let s: ServiceStatus = serde_json::from_value(serde_json::json!({
            "process_running": true,
            "service_status": {"active": true},
            "config_status": {"valid": false, "errors": "zone file"},
            "version": "BIND 9.18.1"
        }))
        .unwrap();
        assert!(s.process_running);
        assert!(s.service_active);
        assert!(!s.config_valid);
        assert!(!s.is_healthy());
        assert_eq!(s.version, "BIND 9.18.1");
    }
}
