//! Lenient deserializers for payloads produced by the WordPress backend, where
//! PHP frequently emits numbers as strings, booleans as `"1"`, and empty
//! objects as `[]`.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

pub fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "yes"),
        _ => false,
    })
}

pub fn optional_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Deserializes `T` only when the value is a JSON object; anything else
/// (`null`, `false`, `[]`) becomes `None`.
pub fn object_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Accepts either a JSON array or `null`; PHP sends `{}`/`[]` interchangeably
/// for empty collections, so an object with no entries is also treated as empty.
pub fn list_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(value @ Value::Array(_)) => {
            serde_json::from_value(value).map_err(serde::de::Error::custom)
        }
        Some(Value::Object(map)) => map
            .into_iter()
            .map(|(_, v)| serde_json::from_value(v).map_err(serde::de::Error::custom))
            .collect(),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "string_or_number")]
        id: String,
        #[serde(default, deserialize_with = "flexible_bool")]
        flag: bool,
        #[serde(default, deserialize_with = "optional_price")]
        price: Option<f64>,
        #[serde(default, deserialize_with = "list_or_empty")]
        items: Vec<String>,
    }

    #[test]
    fn test_numbers_and_strings_are_accepted() {
        let probe: Probe =
            serde_json::from_str(r#"{"id": 42, "flag": "1", "price": "19.99", "items": ["a"]}"#)
                .unwrap();
        assert_eq!(probe.id, "42");
        assert!(probe.flag);
        assert_eq!(probe.price, Some(19.99));
        assert_eq!(probe.items, vec!["a".to_string()]);
    }

    #[test]
    fn test_php_empty_shapes() {
        let probe: Probe =
            serde_json::from_str(r#"{"id": "x", "flag": null, "price": "", "items": {}}"#).unwrap();
        assert!(!probe.flag);
        assert_eq!(probe.price, None);
        assert!(probe.items.is_empty());
    }

    #[test]
    fn test_id_rejects_objects() {
        let result: Result<Probe, _> = serde_json::from_str(r#"{"id": {}}"#);
        assert!(result.is_err());
    }
}
