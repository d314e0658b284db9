use anyhow::{Context, Result};
use kirha_client::PlanningClient;
use kirha_core::{ConfigSource, ConfigStrategy, RuntimeConfig};
use std::fmt;
use std::path::PathBuf;

/// Process-level settings of the HTTP host
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Default key for requests that do not bring their own
    pub api_key: String,
    pub debug: bool,
    pub config_path: Option<PathBuf>,
    pub config_strategy: ConfigStrategy,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            api_key: String::new(),
            debug: false,
            config_path: None,
            config_strategy: ConfigStrategy::ReloadPerInvocation,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key_set", &!self.api_key.is_empty())
            .field("debug", &self.debug)
            .field("config_path", &self.config_path)
            .field("config_strategy", &self.config_strategy)
            .finish()
    }
}

/// Application state shared across handlers; never mutated after startup
#[derive(Clone)]
pub struct AppState {
    pub source: ConfigSource,
    pub api_key: String,
    pub debug: bool,
    pub config_path: Option<PathBuf>,
    pub client: PlanningClient,
}

impl AppState {
    pub async fn new(config: &ServerConfig) -> Result<Self> {
        // Configuration problems degrade to defaults instead of stopping the server
        let source =
            ConfigSource::open_or_default(config.config_strategy, config.config_path.clone()).await;
        let client = PlanningClient::new().context("Failed to create HTTP client")?;

        Ok(Self {
            source,
            api_key: config.api_key.clone(),
            debug: config.debug,
            config_path: config.config_path.clone(),
            client,
        })
    }

    /// Fresh runtime config for one request
    pub fn runtime_for(&self, params: &[(String, String)]) -> RuntimeConfig {
        RuntimeConfig::new(self.api_key.clone(), self.debug, self.config_path.clone())
            .with_query(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:8080");
        assert_eq!(config.config_strategy, ConfigStrategy::ReloadPerInvocation);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let config = ServerConfig {
            api_key: "sk-secret".to_string(),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("api_key_set: true"));
    }

    #[tokio::test]
    async fn test_runtime_for_request() {
        let state = AppState::new(&ServerConfig {
            api_key: "process".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let runtime = state.runtime_for(&[("apiKey".to_string(), "request".to_string())]);
        assert_eq!(runtime.api_key, "process");
        assert_eq!(runtime.override_keys(), vec!["apiKey".to_string()]);
    }
}
