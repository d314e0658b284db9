// Outbound tool-planning request body

use crate::config::SummarizationConfig;
use crate::merge::EffectiveConfig;
use serde::{Deserialize, Serialize};

/// Planning mode sent with every request
pub const PLANNING_MODE: &str = "auto";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningRequest {
    pub mode: String,
    pub query: String,
    pub vertical_id: String,
    pub summarization: SummarizationConfig,
}

impl PlanningRequest {
    pub fn new(config: &EffectiveConfig, query: impl Into<String>) -> Self {
        Self {
            mode: PLANNING_MODE.to_string(),
            query: query.into(),
            vertical_id: config.config.vertical.clone(),
            summarization: config.config.api.summarization.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConfig;
    use crate::merge::merge;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let effective = merge(&StaticConfig::default(), "key", &Default::default());
        let request = PlanningRequest::new(&effective, "what is the price of BTC?");

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "mode": "auto",
                "query": "what is the price of BTC?",
                "vertical_id": "default",
                "summarization": { "enable": true, "model": "kirha-flash" }
            })
        );
    }
}
