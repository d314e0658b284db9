// Effective configuration: static file + process settings + request overrides

use crate::config::StaticConfig;
use crate::overrides::decode_overrides;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

/// Override keys that configure the runtime rather than the static file
const RUNTIME_KEYS: [&str; 3] = ["apiKey", "debug", "configPath"];

/// Where the effective API key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiKeySource {
    /// `apiKey` override on the request
    Request,
    /// `--api-key` flag or `API_KEY` environment variable
    Process,
    None,
}

/// Fully merged configuration for a single outbound call
#[derive(Clone)]
pub struct EffectiveConfig {
    pub config: StaticConfig,
    /// May be empty; checked by the invoker
    pub api_key: String,
    pub api_key_source: ApiKeySource,
    /// Top-level keys of the request overrides that produced this config
    pub override_keys: Vec<String>,
    pub debug: bool,
}

impl EffectiveConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Express this config as request overrides.
    pub fn to_overrides(&self) -> Map<String, Value> {
        let mut overrides = match self.config.to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        overrides.insert("apiKey".to_string(), Value::String(self.api_key.clone()));
        overrides.insert("debug".to_string(), Value::Bool(self.debug));
        overrides
    }
}

// Provenance (key source, override keys) is not part of the value.
impl PartialEq for EffectiveConfig {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config && self.api_key == other.api_key && self.debug == other.debug
    }
}

impl Eq for EffectiveConfig {}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveConfig")
            .field("config", &self.config)
            .field("api_key", &redact(&self.api_key))
            .field("api_key_source", &self.api_key_source)
            .field("override_keys", &self.override_keys)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Combine the static config, the process-level API key and request overrides.
///
/// Precedence is override, then process key, then static value. Objects merge
/// key by key; scalars and arrays are replaced. An override whose type cannot
/// stand in for the static field (an object over a string, `"maybe"` over a
/// bool) is skipped. String overrides of boolean fields accept `"true"` and
/// `"false"`.
pub fn merge(
    static_cfg: &StaticConfig,
    env_api_key: &str,
    overrides: &Map<String, Value>,
) -> EffectiveConfig {
    let mut merged = static_cfg.to_value();
    if let Value::Object(base) = &mut merged {
        for (key, value) in overrides {
            if RUNTIME_KEYS.contains(&key.as_str()) {
                continue;
            }
            merge_entry(base, key, value, key);
        }
    }

    let config = StaticConfig::from_value(merged).unwrap_or_else(|fields| {
        tracing::warn!(?fields, "Merged configuration is invalid, ignoring overrides");
        static_cfg.clone()
    });

    let request_key = overrides
        .get("apiKey")
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty());

    let (api_key, api_key_source) = match request_key {
        Some(key) => (key.to_string(), ApiKeySource::Request),
        None if !env_api_key.is_empty() => (env_api_key.to_string(), ApiKeySource::Process),
        None => (String::new(), ApiKeySource::None),
    };

    EffectiveConfig {
        config,
        api_key,
        api_key_source,
        override_keys: overrides.keys().cloned().collect(),
        debug: overrides.get("debug").is_some_and(is_enabled),
    }
}

fn merge_entry(base: &mut Map<String, Value>, key: &str, overlay: &Value, path: &str) {
    match base.get_mut(key) {
        Some(existing) => deep_merge(existing, overlay, path),
        None => {
            base.insert(key.to_string(), overlay.clone());
        }
    }
}

fn deep_merge(base: &mut Value, overlay: &Value, path: &str) {
    if let (Value::Object(base_map), Value::Object(overlay_map)) = (&mut *base, overlay) {
        for (key, value) in overlay_map {
            merge_entry(base_map, key, value, &format!("{}.{}", path, key));
        }
        return;
    }

    match coerce(base, overlay) {
        Some(value) => *base = value,
        None => tracing::warn!(path, "Ignoring override with incompatible type"),
    }
}

/// Convert `overlay` to the JSON type of `base`, if that makes sense.
fn coerce(base: &Value, overlay: &Value) -> Option<Value> {
    match (base, overlay) {
        (Value::Null, _) => Some(overlay.clone()),
        (Value::Bool(_), Value::Bool(_)) => Some(overlay.clone()),
        (Value::Bool(_), Value::String(s)) => s.parse::<bool>().ok().map(Value::Bool),
        (Value::Number(_), Value::Number(_)) => Some(overlay.clone()),
        (Value::Number(_), Value::String(s)) => s.parse().ok().map(Value::Number),
        (Value::String(_), Value::String(_)) => Some(overlay.clone()),
        (Value::String(_), Value::Bool(b)) => Some(Value::String(b.to_string())),
        (Value::String(_), Value::Number(n)) => Some(Value::String(n.to_string())),
        (Value::Array(_), Value::Array(_)) => Some(overlay.clone()),
        _ => None,
    }
}

fn is_enabled(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        "<none>"
    } else {
        "<redacted>"
    }
}

/// Settings derived from CLI flags, environment and request query parameters
#[derive(Clone, Default)]
pub struct RuntimeConfig {
    /// Process-level key (`--api-key` / `API_KEY`), possibly empty
    pub api_key: String,
    pub debug: bool,
    pub config_path: Option<PathBuf>,
    /// Nested overrides decoded from the request, empty in stdio mode
    pub overrides: Map<String, Value>,
}

impl RuntimeConfig {
    pub fn new(api_key: impl Into<String>, debug: bool, config_path: Option<PathBuf>) -> Self {
        Self {
            api_key: api_key.into(),
            debug,
            config_path,
            overrides: Map::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: Map<String, Value>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Attach overrides decoded from request query parameters.
    pub fn with_query(self, params: &[(String, String)]) -> Self {
        self.with_overrides(decode_overrides(params))
    }

    /// Top-level override keys, for diagnostics
    pub fn override_keys(&self) -> Vec<String> {
        self.overrides.keys().cloned().collect()
    }

    /// Produce the effective config for one invocation.
    pub fn resolve(&self, static_cfg: &StaticConfig) -> EffectiveConfig {
        let mut effective = merge(static_cfg, &self.api_key, &self.overrides);
        effective.debug |= self.debug;
        effective
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("api_key", &redact(&self.api_key))
            .field("debug", &self.debug)
            .field("config_path", &self.config_path)
            .field("override_keys", &self.override_keys())
            .finish()
    }
}
