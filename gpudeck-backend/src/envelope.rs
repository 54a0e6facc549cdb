//! Tolerant decoding of list/object responses.
//!
//! Endpoints answer either with a bare payload or wrap it in an object
//! (`{"instances": [...]}`, `{"data": [...]}`). Both shapes are accepted.

use gpudeck_common::ApiError;
use serde::de::DeserializeOwned;
use serde_json::Value;

const FALLBACK_LIST_KEYS: [&str; 3] = ["data", "items", "results"];

/// Decode a list from `value`, looking under `key` first.
///
/// A missing list (null, or an object without any known key) is an empty
/// list; a list with the wrong item shape is a `Decode` error.
pub fn extract_list<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>, ApiError> {
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => {
            let found = std::iter::once(key)
                .chain(FALLBACK_LIST_KEYS)
                .find_map(|k| match map.remove(k) {
                    Some(v @ Value::Array(_)) => Some(v),
                    _ => None,
                });
            match found {
                Some(v) => v,
                None => return Ok(vec![]),
            }
        }
        _ => return Ok(vec![]),
    };
    serde_json::from_value(list).map_err(|e| ApiError::Decode(format!("{} list: {}", key, e)))
}

/// Decode one object, unwrapping `{key: {...}}` / `{data: {...}}` when present.
pub fn extract_object<T: DeserializeOwned>(value: Value, key: &str) -> Result<T, ApiError> {
    let inner = match value {
        Value::Object(ref map) => map
            .get(key)
            .or_else(|| map.get("data"))
            .filter(|v| v.is_object())
            .cloned(),
        _ => None,
    };
    let target = inner.unwrap_or(value);
    serde_json::from_value(target).map_err(|e| ApiError::Decode(format!("{}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i64,
    }

    #[test]
    fn bare_and_wrapped_lists_decode_the_same() {
        let bare: Vec<Item> = extract_list(json!([{"id": 1}]), "jobs").unwrap();
        let wrapped: Vec<Item> = extract_list(json!({"jobs": [{"id": 1}]}), "jobs").unwrap();
        let data: Vec<Item> = extract_list(json!({"data": [{"id": 1}]}), "jobs").unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare, data);
    }

    #[test]
    fn missing_list_is_empty() {
        let a: Vec<Item> = extract_list(json!({"total": 0}), "jobs").unwrap();
        let b: Vec<Item> = extract_list(Value::Null, "jobs").unwrap();
        assert!(a.is_empty() && b.is_empty());
    }

    #[test]
    fn wrong_item_shape_is_a_decode_error() {
        let r: Result<Vec<Item>, _> = extract_list(json!([{"id": "x"}]), "jobs");
        assert!(matches!(r, Err(ApiError::Decode(_))));
    }

    #[test]
    fn object_unwraps_known_key() {
        let a: Item = extract_object(json!({"team": {"id": 3}}), "team").unwrap();
        let b: Item = extract_object(json!({"id": 3}), "team").unwrap();
        assert_eq!(a, b);
    }
}
