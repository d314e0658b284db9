//! Configuration types for the planning client.

use std::time::Duration;

/// Configuration for the planning client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent sent with every request.
    pub user_agent: String,
    /// Request timeout. `None` leaves the HTTP layer's default in place.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("kirha-mcp/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();

        assert!(config.user_agent.starts_with("kirha-mcp/"));
        assert!(config.timeout.is_none());
    }
}
