// Tool-planning tool: forwards a natural-language query to the planning API

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, json_schema_string, Tool};
use anyhow::{Context, Result};
use kirha_client::{PlanningClient, PlanningError};
use kirha_core::{ApiKeySource, ConfigSource, EffectiveConfig, RuntimeConfig, ToolConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const QUERY_DESCRIPTION: &str = "Your question or query to be processed";

/// Run one planning call and encode the outcome as a single text block.
///
/// Never fails: a missing key, an HTTP rejection or a transport error all
/// come back as `Error: ...` text so the MCP session stays usable.
pub async fn invoke(client: &PlanningClient, config: &EffectiveConfig, query: &str) -> CallToolResult {
    if !config.has_api_key() {
        return missing_key_result(config);
    }

    match client.plan(config, query).await {
        Ok(body) => match serde_json::to_string_pretty(&body) {
            Ok(text) => CallToolResult::text(text),
            Err(e) => CallToolResult::error(e),
        },
        Err(e) => {
            tracing::warn!(error = %e, status = ?e.status(), "Tool planning failed");
            CallToolResult::error(e)
        }
    }
}

/// What a debug-mode caller sees about key resolution; never the key itself
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MissingKeyDiagnostics<'a> {
    api_key_source: ApiKeySource,
    override_keys: &'a [String],
    vertical: &'a str,
    execute_tool_planning_url: &'a str,
}

fn missing_key_result(config: &EffectiveConfig) -> CallToolResult {
    let mut text = format!("Error: {}", PlanningError::MissingApiKey);

    if config.debug {
        let diagnostics = MissingKeyDiagnostics {
            api_key_source: config.api_key_source,
            override_keys: &config.override_keys,
            vertical: &config.config.vertical,
            execute_tool_planning_url: &config.config.api.execute_tool_planning_url,
        };
        if let Ok(dump) = serde_json::to_string_pretty(&diagnostics) {
            text.push_str("\n\nDebug info: ");
            text.push_str(&dump);
        }
    }

    CallToolResult::text(text)
}

#[derive(Debug, Deserialize)]
struct ToolPlanningArgs {
    query: String,
}

/// The tool registered under the name configured in `tool.name`
pub struct ToolPlanningTool {
    tool: ToolConfig,
    source: ConfigSource,
    runtime: Arc<RuntimeConfig>,
    client: PlanningClient,
}

impl ToolPlanningTool {
    pub fn new(
        tool: ToolConfig,
        source: ConfigSource,
        runtime: Arc<RuntimeConfig>,
        client: PlanningClient,
    ) -> Self {
        Self {
            tool,
            source,
            runtime,
            client,
        }
    }
}

#[async_trait::async_trait]
impl Tool for ToolPlanningTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.tool.name.clone(),
            title: Some(self.tool.title.clone()),
            description: self.tool.description.clone(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "query": json_schema_string(QUERY_DESCRIPTION)
                }),
                vec!["query"],
            ),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: ToolPlanningArgs = serde_json::from_value(arguments)
            .with_context(|| format!("Invalid arguments for {}", self.tool.name))?;

        // Reload-per-invocation sources pick up config edits here
        let static_cfg = self.source.load_or_default().await;
        let effective = self.runtime.resolve(&static_cfg);

        tracing::debug!(
            tool = %self.tool.name,
            vertical = %effective.config.vertical,
            "Executing tool planning"
        );

        Ok(invoke(&self.client, &effective, &args.query).await)
    }
}
