// Per-request configuration overrides decoded from query parameters

use crate::error::OverrideError;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{Map, Value};

/// Query parameters in the order they appeared on the request
pub type QueryParams = Vec<(String, String)>;

/// Parameter carrying a base64-encoded JSON object
pub const CONFIG_PARAM: &str = "config";

/// Parameters never expanded as dot-notation override paths
pub const RESERVED_PARAMS: [&str; 3] = [CONFIG_PARAM, "api_key", "profile"];

/// Build the nested override object for one request.
///
/// The `config` parameter (base64 JSON) is applied first, then every other
/// non-reserved key is expanded along its dots, so `api.summarization.model=fast`
/// becomes `{"api": {"summarization": {"model": "fast"}}}`. Dot-notation values
/// stay strings and win over the decoded blob; later keys win over earlier ones.
/// A malformed `config` blob is logged and ignored.
pub fn decode_overrides(params: &[(String, String)]) -> Map<String, Value> {
    let mut result = Map::new();

    if let Some((_, encoded)) = params.iter().find(|(key, _)| key == CONFIG_PARAM) {
        match decode_config_param(encoded) {
            Ok(decoded) => result.extend(decoded),
            Err(e) => tracing::warn!(error = %e, "Error parsing base64 config"),
        }
    }

    for (key, value) in params {
        if key.is_empty() || RESERVED_PARAMS.contains(&key.as_str()) {
            continue;
        }
        let segments: Vec<&str> = key.split('.').collect();
        insert_path(&mut result, &segments, Value::String(value.clone()));
    }

    result
}

/// Decode a base64 JSON object.
///
/// Accepts standard and URL-safe alphabets with or without padding. Spaces are
/// read as `+`, since form decoding of an unescaped query turns `+` into a space.
pub fn decode_config_param(encoded: &str) -> Result<Map<String, Value>, OverrideError> {
    let normalized: String = encoded
        .trim()
        .chars()
        .map(|c| if c == ' ' { '+' } else { c })
        .filter(|c| !c.is_whitespace())
        .collect();
    let normalized = normalized.trim_end_matches('=');

    let bytes = if normalized.contains(|c| c == '-' || c == '_') {
        URL_SAFE_NO_PAD.decode(normalized)?
    } else {
        STANDARD_NO_PAD.decode(normalized)?
    };

    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(OverrideError::NotAnObject),
    }
}

/// Set `value` at `segments`, creating intermediate objects as needed.
/// A scalar sitting where an intermediate object is needed is replaced.
fn insert_path(map: &mut Map<String, Value>, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [leaf] => {
            map.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_path(child, rest, value);
            }
        }
    }
}
