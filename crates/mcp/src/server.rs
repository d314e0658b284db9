//! MCP server: JSON-RPC dispatch and the stdio transport.

use crate::protocol::*;
use crate::tools::{ToolPlanningTool, ToolRegistry};
use kirha_client::PlanningClient;
use kirha_core::{ConfigSource, RuntimeConfig, StaticConfig};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// MCP server exposing the tools in its registry.
///
/// Cheap to clone; clones share the registered tools.
#[derive(Clone)]
pub struct McpServer {
    info: ServerInfo,
    registry: ToolRegistry,
}

/// Build the gateway server from a loaded static config.
///
/// The server identifies itself with `mcp.name`/`mcp.version`. The planning tool
/// is registered only when `tool.enabled` is set; at call time it reads its
/// config from `source` and merges `runtime` into it.
pub fn create_server(
    static_cfg: &StaticConfig,
    source: ConfigSource,
    runtime: Arc<RuntimeConfig>,
    client: PlanningClient,
) -> McpServer {
    let debug = runtime.debug;
    if debug {
        match serde_json::to_string_pretty(static_cfg) {
            Ok(dump) => info!("Loaded configuration: {}", dump),
            Err(e) => warn!(error = %e, "Failed to render configuration"),
        }
    }

    let info = ServerInfo {
        name: static_cfg.mcp.name.clone(),
        version: static_cfg.mcp.version.clone(),
    };

    let mut registry = ToolRegistry::new();
    let tool = &static_cfg.tool;
    if tool.enabled {
        registry.register(Arc::new(ToolPlanningTool::new(
            tool.clone(),
            source,
            runtime,
            client,
        )));
        if debug {
            info!("Registered tool: {}", tool.name);
        }
    } else if debug {
        info!("Tool disabled: {}", tool.name);
    }

    McpServer::new(info, registry)
}

impl McpServer {
    pub fn new(info: ServerInfo, registry: ToolRegistry) -> Self {
        Self { info, registry }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one JSON-RPC request. Notifications yield `None`.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "Handling MCP request");

        let Some(id) = request.id else {
            debug!(method = %request.method, "Received notification");
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }

        let params = request.params.unwrap_or(Value::Null);
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, params),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, params).await,
            method => {
                warn!(method, "Unknown method");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(method))
            }
        };

        Some(response)
    }

    /// Handle a decoded message body: a single request or a batch.
    ///
    /// Returns `None` when nothing needs answering (notifications, or
    /// responses sent by the client).
    pub async fn handle_message(&self, message: Value) -> Option<Value> {
        match message {
            Value::Array(items) if items.is_empty() => to_value(JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::invalid_request(),
            )),
            Value::Array(items) => {
                let mut responses = Vec::new();
                for item in items {
                    if let Some(response) = self.handle_single(item).await {
                        responses.push(response);
                    }
                }
                (!responses.is_empty()).then_some(Value::Array(responses))
            }
            single => self.handle_single(single).await,
        }
    }

    async fn handle_single(&self, message: Value) -> Option<Value> {
        if is_client_response(&message) {
            debug!("Ignoring response message from client");
            return None;
        }

        match serde_json::from_value::<JsonRpcRequest>(message) {
            Ok(request) => to_value(self.handle_request(request).await?),
            Err(e) => {
                warn!(error = %e, "Invalid JSON-RPC request");
                to_value(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::invalid_request(),
                ))
            }
        }
    }

    fn handle_initialize(&self, id: Value, params: Value) -> JsonRpcResponse {
        let params: InitializeParams = if params.is_null() {
            InitializeParams::default()
        } else {
            match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid params: {}", e)),
                    );
                }
            }
        };

        if let Some(client) = &params.client_info {
            debug!(client = %client.name, version = %client.version, "Client connected");
        }

        let result = InitializeResult {
            protocol_version: negotiate_protocol_version(params.protocol_version.as_deref())
                .to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
        };

        info!(server = %self.info.name, "MCP server initialized");
        respond(id, &result)
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let result = ListToolsResult {
            tools: self.registry.list_schemas(),
        };
        respond(id, &result)
    }

    async fn handle_tools_call(&self, id: Value, params: Value) -> JsonRpcResponse {
        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params(format!("Invalid params: {}", e)),
                );
            }
        };

        let Some(tool) = self.registry.get(&params.name) else {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)),
            );
        };

        debug!(tool = %params.name, "Calling tool");

        match tool.execute(params.arguments).await {
            Ok(result) => respond(id, &result),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::invalid_params(format!("{:#}", e))),
        }
    }

    /// Serve newline-delimited JSON-RPC over stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        info!("MCP server listening on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await?;
        info!("MCP server shutdown");
        Ok(())
    }

    /// Serve newline-delimited JSON-RPC over any reader/writer pair.
    ///
    /// Each message is handled on its own task, so a slow tool call does not
    /// hold up later requests. Responses are written in completion order. Once
    /// the reader is exhausted, in-flight requests are drained before returning.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
        let mut tx = Some(tx);
        let mut lines = reader.lines();

        loop {
            tokio::select! {
                line = lines.next_line(), if tx.is_some() => match line? {
                    Some(line) => {
                        if let Some(tx) = &tx {
                            self.dispatch_line(&line, tx);
                        }
                    }
                    // Input closed; the channel closes once every task has answered
                    None => tx = None,
                },
                response = rx.recv() => match response {
                    Some(response) => write_frame(&mut writer, &response).await?,
                    None => break,
                },
            }
        }

        Ok(())
    }

    fn dispatch_line(&self, line: &str, tx: &mpsc::UnboundedSender<Value>) {
        if line.trim().is_empty() {
            return;
        }

        let message = match serde_json::from_str::<Value>(line) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "Failed to parse request");
                if let Some(response) = to_value(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error(format!("Parse error: {}", e)),
                )) {
                    let _ = tx.send(response);
                }
                return;
            }
        };

        let server = self.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(response) = server.handle_message(message).await {
                // Receiver only goes away when the transport failed
                let _ = tx.send(response);
            }
        });
    }
}

async fn write_frame<W>(writer: &mut W, response: &Value) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let response_json = serde_json::to_string(response)?;
    writer.write_all(response_json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

fn respond(id: Value, result: &impl serde::Serialize) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
    }
}

fn to_value(response: JsonRpcResponse) -> Option<Value> {
    serde_json::to_value(response).ok()
}

fn is_client_response(message: &Value) -> bool {
    message.get("method").is_none()
        && (message.get("result").is_some() || message.get("error").is_some())
}
