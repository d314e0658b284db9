//! HTTP client for the tool-planning endpoint.

use crate::config::ClientConfig;
use crate::error::{PlanningError, PlanningResult};
use kirha_core::{EffectiveConfig, PlanningRequest};
use reqwest::{header, Client};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Client that performs one planning call per invocation.
///
/// No retries, no caching. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct PlanningClient {
    http: Client,
}

impl PlanningClient {
    /// Create a client with the default configuration.
    pub fn new() -> PlanningResult<Self> {
        Self::from_config(ClientConfig::default())
    }

    /// Create a new client builder.
    pub fn builder() -> PlanningClientBuilder {
        PlanningClientBuilder::new()
    }

    fn from_config(config: ClientConfig) -> PlanningResult<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
        })
    }

    /// Run tool planning for `query` with the endpoint, key, vertical and
    /// summarization settings of `config`.
    pub async fn plan(&self, config: &EffectiveConfig, query: &str) -> PlanningResult<Value> {
        let request = PlanningRequest::new(config, query);
        self.execute(
            &config.config.api.execute_tool_planning_url,
            &config.api_key,
            &request,
        )
        .await
    }

    /// POST `request` to `url` and return the parsed JSON response.
    pub async fn execute(
        &self,
        url: &str,
        api_key: &str,
        request: &PlanningRequest,
    ) -> PlanningResult<Value> {
        if api_key.is_empty() {
            return Err(PlanningError::MissingApiKey);
        }

        let url = Url::parse(url)?;
        let authorization = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| PlanningError::InvalidApiKey)?;

        debug!(url = %url, vertical = %request.vertical_id, "POST tool planning request");

        let response = self
            .http
            .post(url)
            .header(header::AUTHORIZATION, authorization)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Tool planning request failed");
            return Err(PlanningError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Builder for [`PlanningClient`].
#[derive(Debug, Default)]
pub struct PlanningClientBuilder {
    config: ClientConfig,
}

impl PlanningClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set an explicit request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> PlanningResult<PlanningClient> {
        PlanningClient::from_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kirha_core::{merge, StaticConfig};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn effective_for(url: &str, api_key: &str) -> EffectiveConfig {
        let mut config = StaticConfig::default();
        config.api.execute_tool_planning_url = url.to_string();
        config.vertical = "crypto".to_string();
        merge(&config, api_key, &Default::default())
    }

    #[tokio::test]
    async fn test_plan_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/plan"))
            .and(header("Authorization", "Bearer sk-test-key"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({
                "mode": "auto",
                "query": "price of BTC",
                "vertical_id": "crypto",
                "summarization": { "enable": true, "model": "kirha-flash" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "plan": "x" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PlanningClient::new().unwrap();
        let config = effective_for(&format!("{}/plan", server.uri()), "sk-test-key");

        let result = client.plan(&config, "price of BTC").await.unwrap();
        assert_eq!(result, json!({ "plan": "x" }));
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = PlanningClient::new().unwrap();
        let config = effective_for(&server.uri(), "sk-test-key");

        let err = client.plan(&config, "q").await.unwrap_err();
        assert!(matches!(err, PlanningError::Http { status: 500 }));
        assert_eq!(err.to_string(), "HTTP error! status: 500");
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = PlanningClient::new().unwrap();
        let config = effective_for(&server.uri(), "");

        let err = client.plan(&config, "q").await.unwrap_err();
        assert!(matches!(err, PlanningError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = PlanningClient::new().unwrap();
        let config = effective_for(&server.uri(), "sk-test-key");

        let err = client.plan(&config, "q").await.unwrap_err();
        assert!(matches!(err, PlanningError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PlanningClient::new().unwrap();
        let config = effective_for(&format!("http://{}/plan", addr), "sk-test-key");

        let err = client.plan(&config, "q").await.unwrap_err();
        assert!(matches!(err, PlanningError::Network(_)));
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let client = PlanningClient::new().unwrap();
        let config = effective_for("not a url", "sk-test-key");

        let err = client.plan(&config, "q").await.unwrap_err();
        assert!(matches!(err, PlanningError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_invalid_api_key() {
        let client = PlanningClient::new().unwrap();
        let config = effective_for("http://localhost/plan", "bad\nkey");

        let err = client.plan(&config, "q").await.unwrap_err();
        assert!(matches!(err, PlanningError::InvalidApiKey));
    }

    #[test]
    fn test_builder() {
        let client = PlanningClient::builder()
            .user_agent("test-agent")
            .timeout(Duration::from_secs(5))
            .build();
        assert!(client.is_ok());
    }
}
