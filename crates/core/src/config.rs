// Static configuration file: schema, loading, validation and source strategy

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// File name looked up in the install root when no path is given
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Parsed contents of `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticConfig {
    pub mcp: McpInfo,
    pub tool: ToolConfig,
    /// Routing identifier of the backend planner
    pub vertical: String,
    pub api: ApiConfig,
}

/// Server identity advertised during MCP initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpInfo {
    pub name: String,
    pub version: String,
}

/// Registration details of the tool-planning tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub name: String,
    pub title: String,
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub execute_tool_planning_url: String,
    pub summarization: SummarizationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizationConfig {
    pub enable: bool,
    pub model: String,
}

fn default_enabled() -> bool {
    true
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            mcp: McpInfo {
                name: "kirha-gateway".to_string(),
                version: "1.0.0".to_string(),
            },
            tool: ToolConfig {
                name: "execute-tool-planning".to_string(),
                title: "Tool Planning".to_string(),
                description: "Execute tool planning with your configured vertical".to_string(),
                enabled: true,
            },
            vertical: "default".to_string(),
            api: ApiConfig {
                execute_tool_planning_url: "https://api.kirha.ai/chat/v1/tool-planning/execute"
                    .to_string(),
                summarization: SummarizationConfig {
                    enable: true,
                    model: "kirha-flash".to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    String,
    Bool,
}

impl FieldKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
        }
    }
}

/// (path, kind, required)
const SCHEMA: &[(&str, FieldKind, bool)] = &[
    ("mcp.name", FieldKind::String, true),
    ("mcp.version", FieldKind::String, true),
    ("tool.name", FieldKind::String, true),
    ("tool.title", FieldKind::String, true),
    ("tool.description", FieldKind::String, true),
    ("tool.enabled", FieldKind::Bool, false),
    ("vertical", FieldKind::String, true),
    ("api.executeToolPlanningUrl", FieldKind::String, true),
    ("api.summarization.enable", FieldKind::Bool, true),
    ("api.summarization.model", FieldKind::String, true),
];

/// Walk a dot-separated path through nested JSON objects
pub(crate) fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, segment| node.get(segment))
}

/// Return every schema path that is missing or has the wrong type.
fn validate(value: &Value) -> Vec<String> {
    if !value.is_object() {
        return vec!["<root>".to_string()];
    }

    SCHEMA
        .iter()
        .filter(|(path, kind, required)| match lookup(value, path) {
            Some(field) => !kind.matches(field),
            None => *required,
        })
        .map(|(path, _, _)| path.to_string())
        .collect()
}

impl StaticConfig {
    /// Validate a JSON document and convert it into a typed config.
    ///
    /// On failure the offending field paths are returned.
    pub fn from_value(value: Value) -> Result<Self, Vec<String>> {
        let violations = validate(&value);
        if !violations.is_empty() {
            return Err(violations);
        }
        serde_json::from_value(value).map_err(|e| vec![e.to_string()])
    }

    /// The config as a JSON object using the file's field names
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Default config location: `<install root>/config.json`.
///
/// The install root is the parent of the directory holding the running
/// executable (`<root>/bin/kirha-mcp` resolves to `<root>/config.json`).
pub fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| install_root(&exe))
        .map(|root| root.join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

fn install_root(exe: &Path) -> Option<PathBuf> {
    exe.parent()?.parent().map(Path::to_path_buf)
}

/// Read and validate the static configuration.
///
/// Uses `path` when given, otherwise [`default_config_path`]. Nothing is cached.
/// The read goes through `tokio::fs`, so a slow file never stalls a runtime worker.
pub async fn load_static_config(path: Option<&Path>) -> Result<StaticConfig, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ConfigError::load(&path, e))?;

    parse_static_config(path, &content)
}

/// Parse and validate config file contents read from `path`.
fn parse_static_config(path: PathBuf, content: &str) -> Result<StaticConfig, ConfigError> {
    let value: Value = serde_json::from_str(content).map_err(|e| ConfigError::load(&path, e))?;

    StaticConfig::from_value(value).map_err(|fields| ConfigError::Validation { path, fields })
}

/// When the static configuration is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStrategy {
    /// Read once, reuse for every invocation
    CacheAtStartup,
    /// Re-read on every invocation so edits apply without a restart
    ReloadPerInvocation,
}

impl FromStr for ConfigStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cache" | "cache-at-startup" => Ok(Self::CacheAtStartup),
            "reload" | "reload-per-invocation" => Ok(Self::ReloadPerInvocation),
            other => Err(format!(
                "unknown config strategy '{}' (expected 'cache' or 'reload')",
                other
            )),
        }
    }
}

impl fmt::Display for ConfigStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheAtStartup => write!(f, "cache"),
            Self::ReloadPerInvocation => write!(f, "reload"),
        }
    }
}

/// Where a server gets its [`StaticConfig`] from
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Loaded once; never re-read
    Cached(Arc<StaticConfig>),
    /// Re-read from this path (or the default path) on every load
    Reload(Option<PathBuf>),
}

impl ConfigSource {
    /// Build a source, loading the file immediately for the cached strategy.
    pub async fn open(strategy: ConfigStrategy, path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match strategy {
            ConfigStrategy::CacheAtStartup => {
                let config = load_static_config(path.as_deref()).await?;
                Ok(Self::Cached(Arc::new(config)))
            }
            ConfigStrategy::ReloadPerInvocation => Ok(Self::Reload(path)),
        }
    }

    /// Like [`ConfigSource::open`], but a cached source that fails to load
    /// holds the built-in defaults instead.
    pub async fn open_or_default(strategy: ConfigStrategy, path: Option<PathBuf>) -> Self {
        match strategy {
            ConfigStrategy::CacheAtStartup => {
                Self::Cached(Arc::new(fallback(load_static_config(path.as_deref()).await)))
            }
            ConfigStrategy::ReloadPerInvocation => Self::Reload(path),
        }
    }

    pub fn strategy(&self) -> ConfigStrategy {
        match self {
            Self::Cached(_) => ConfigStrategy::CacheAtStartup,
            Self::Reload(_) => ConfigStrategy::ReloadPerInvocation,
        }
    }

    pub async fn load(&self) -> Result<Arc<StaticConfig>, ConfigError> {
        match self {
            Self::Cached(config) => Ok(config.clone()),
            Self::Reload(path) => load_static_config(path.as_deref()).await.map(Arc::new),
        }
    }

    /// Load the config, degrading to [`StaticConfig::default`] on any error.
    pub async fn load_or_default(&self) -> Arc<StaticConfig> {
        match self {
            Self::Cached(config) => config.clone(),
            Self::Reload(path) => Arc::new(fallback(load_static_config(path.as_deref()).await)),
        }
    }
}

fn fallback(result: Result<StaticConfig, ConfigError>) -> StaticConfig {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Configuration not available, using defaults");
        StaticConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID: &str = r#"{
        "mcp": { "name": "test-gateway", "version": "2.0.0" },
        "tool": {
            "name": "plan",
            "title": "Plan",
            "description": "Plans things",
            "enabled": false
        },
        "vertical": "crypto",
        "api": {
            "executeToolPlanningUrl": "http://localhost:9999/plan",
            "summarization": { "enable": false, "model": "slow" }
        }
    }"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn without_enabled() -> String {
        VALID.replace(",\n            \"enabled\": false", "")
    }

    #[tokio::test]
    async fn test_load_valid_config() {
        let file = write_config(VALID);
        let config = load_static_config(Some(file.path())).await.unwrap();

        assert_eq!(config.mcp.name, "test-gateway");
        assert_eq!(config.mcp.version, "2.0.0");
        assert_eq!(config.tool.name, "plan");
        assert!(!config.tool.enabled);
        assert_eq!(config.vertical, "crypto");
        assert_eq!(
            config.api.execute_tool_planning_url,
            "http://localhost:9999/plan"
        );
        assert!(!config.api.summarization.enable);
        assert_eq!(config.api.summarization.model, "slow");
    }

    #[tokio::test]
    async fn test_tool_enabled_defaults_to_true() {
        let file = write_config(&without_enabled());
        let config = load_static_config(Some(file.path())).await.unwrap();
        assert!(config.tool.enabled);
    }

    #[tokio::test]
    async fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");

        let err = load_static_config(Some(&path)).await.unwrap_err();
        match err {
            ConfigError::Load { path: attempted, .. } => assert_eq!(attempted, path),
            other => panic!("Expected load error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_load_error() {
        let file = write_config("{ not json");
        let err = load_static_config(Some(file.path())).await.unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
        assert!(err.to_string().contains("Failed to load configuration"));
    }

    #[tokio::test]
    async fn test_missing_fields_are_listed() {
        let file = write_config(r#"{ "mcp": { "name": "x" }, "vertical": "v" }"#);
        let err = load_static_config(Some(file.path())).await.unwrap_err();

        let fields = err.fields();
        assert!(fields.contains(&"mcp.version".to_string()));
        assert!(fields.contains(&"tool.name".to_string()));
        assert!(fields.contains(&"api.summarization.model".to_string()));
        assert!(!fields.contains(&"mcp.name".to_string()));
        assert!(!fields.contains(&"vertical".to_string()));
        // Optional field is never reported as missing
        assert!(!fields.contains(&"tool.enabled".to_string()));
    }

    #[tokio::test]
    async fn test_wrong_types_are_listed() {
        let content = VALID
            .replace("\"crypto\"", "42")
            .replace("\"enabled\": false", "\"enabled\": \"yes\"");
        let file = write_config(&content);

        let err = load_static_config(Some(file.path())).await.unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert_eq!(err.fields(), ["tool.enabled", "vertical"]);
    }

    #[tokio::test]
    async fn test_non_object_root() {
        let file = write_config("[1, 2, 3]");
        let err = load_static_config(Some(file.path())).await.unwrap_err();
        assert_eq!(err.fields(), ["<root>"]);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = StaticConfig::default();
        let roundtrip = StaticConfig::from_value(config.to_value()).unwrap();
        assert_eq!(roundtrip, config);
    }

    #[test]
    fn test_install_root() {
        let exe = Path::new("/opt/kirha/bin/kirha-mcp");
        assert_eq!(install_root(exe), Some(PathBuf::from("/opt/kirha")));
        assert_eq!(install_root(Path::new("kirha-mcp")), None);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "cache".parse::<ConfigStrategy>().unwrap(),
            ConfigStrategy::CacheAtStartup
        );
        assert_eq!(
            "Reload".parse::<ConfigStrategy>().unwrap(),
            ConfigStrategy::ReloadPerInvocation
        );
        assert_eq!(
            "reload-per-invocation".parse::<ConfigStrategy>().unwrap(),
            ConfigStrategy::ReloadPerInvocation
        );
        assert!("sometimes".parse::<ConfigStrategy>().is_err());
        assert_eq!(ConfigStrategy::CacheAtStartup.to_string(), "cache");
    }

    #[tokio::test]
    async fn test_cached_source_ignores_later_edits() {
        let file = write_config(VALID);
        let source = ConfigSource::open(
            ConfigStrategy::CacheAtStartup,
            Some(file.path().to_path_buf()),
        )
        .await
        .unwrap();

        std::fs::write(file.path(), VALID.replace("crypto", "weather")).unwrap();

        assert_eq!(source.load().await.unwrap().vertical, "crypto");
        assert_eq!(source.strategy(), ConfigStrategy::CacheAtStartup);
    }

    #[tokio::test]
    async fn test_reload_source_sees_edits() {
        let file = write_config(VALID);
        let source = ConfigSource::open(
            ConfigStrategy::ReloadPerInvocation,
            Some(file.path().to_path_buf()),
        )
        .await
        .unwrap();

        assert_eq!(source.load().await.unwrap().vertical, "crypto");
        std::fs::write(file.path(), VALID.replace("crypto", "weather")).unwrap();
        assert_eq!(source.load().await.unwrap().vertical, "weather");
    }

    #[tokio::test]
    async fn test_cached_source_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigSource::open(
            ConfigStrategy::CacheAtStartup,
            Some(dir.path().join("missing.json")),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Some(dir.path().join("missing.json"));

        let cached =
            ConfigSource::open_or_default(ConfigStrategy::CacheAtStartup, missing.clone()).await;
        assert_eq!(*cached.load_or_default().await, StaticConfig::default());

        let reload =
            ConfigSource::open_or_default(ConfigStrategy::ReloadPerInvocation, missing).await;
        assert!(reload.load().await.is_err());
        assert_eq!(*reload.load_or_default().await, StaticConfig::default());
    }
}
