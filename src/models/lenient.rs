// Lenient field decoders: absent, null or wrong-typed values become zero/empty.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn f64_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    })
}

pub(crate) fn u64_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.max(0.0) as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    })
}

pub(crate) fn u32_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    u64_or_zero(d).map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}

pub(crate) fn bool_or_false<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(matches!(Value::deserialize(d)?, Value::Bool(true)))
}

pub(crate) fn string_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Optional millisecond value: only a positive number counts as present.
pub(crate) fn positive_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite() && *f > 0.0),
        _ => None,
    })
}

/// Vec whose malformed elements are dropped instead of failing the whole list.
pub(crate) fn vec_skip_invalid<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Nested object that reads as `None` when it is not an object or does not
/// decode.
pub(crate) fn object_or_none<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(d)? {
        v @ Value::Object(_) => serde_json::from_value(v).ok(),
        _ => None,
    })
}

/// Decodes an optional section. A section that is missing, `null`, not an
/// object, or the backend's `{"error": ...}` marker is treated as absent.
pub(crate) fn section<T: DeserializeOwned>(value: Option<&Value>) -> Option<T> {
    let value = value?;
    let obj = value.as_object()?;
    if obj.len() == 1 && obj.contains_key("error") {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Default)]
    struct Probe {
        #[serde(default, deserialize_with = "u64_or_zero")]
        bytes: u64,
        #[serde(default, deserialize_with = "f64_or_zero")]
        percent: f64,
        #[serde(default, deserialize_with = "bool_or_false")]
        up: bool,
    }

    #[test]
    fn null_and_wrong_types_default_to_zero() {
        let p: Probe =
            serde_json::from_str(r#"{"bytes": null, "percent": "n/a", "up": 1}"#).unwrap();
        assert_eq!(p.bytes, 0);
        assert_eq!(p.percent, 0.0);
        assert!(!p.up);
    }

    #[test]
    fn float_bytes_are_truncated() {
        let p: Probe = serde_json::from_str(r#"{"bytes": 1234.9, "percent": 12}"#).unwrap();
        assert_eq!(p.bytes, 1234);
        assert_eq!(p.percent, 12.0);
    }

    #[test]
    fn error_marker_section_is_absent() {
        let v: Value = serde_json::json!({"error": "psutil failed"});
        assert!(section::<serde_json::Map<String, Value>>(Some(&v)).is_none());
        let v: Value = serde_json::json!("oops");
        assert!(section::<serde_json::Map<String, Value>>(Some(&v)).is_none());
    }
}
