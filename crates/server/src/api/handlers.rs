use super::{McpHttpError, McpResult};
use crate::config::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use kirha_core::{ConfigSource, QueryParams};
use kirha_mcp::create_server;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Logs the end of a request in debug mode.
///
/// Also fires when the client disconnects and the handler future is dropped.
struct RequestScope {
    id: Uuid,
    debug: bool,
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        if self.debug {
            info!(request_id = %self.id, "Request closed");
        }
    }
}

/// MCP endpoint (stateless streamable HTTP)
///
/// Every request gets its own server built from a config snapshot and the
/// overrides in its query string.
pub async fn handle_mcp(
    State(state): State<Arc<AppState>>,
    method: Method,
    Query(params): Query<QueryParams>,
    body: Bytes,
) -> McpResult<Response> {
    let static_cfg = state.source.load_or_default().await;
    let runtime = state.runtime_for(&params);
    let debug = runtime.resolve(&static_cfg).debug;

    let scope = RequestScope {
        id: Uuid::new_v4(),
        debug,
    };
    debug!(
        request_id = %scope.id,
        %method,
        override_keys = ?runtime.override_keys(),
        "MCP request"
    );

    if method == Method::GET {
        return Err(McpHttpError::MethodNotAllowed);
    }
    if method == Method::DELETE {
        // Nothing to terminate without sessions
        return Ok(StatusCode::OK.into_response());
    }

    let message: Value =
        serde_json::from_slice(&body).map_err(|e| McpHttpError::Parse(e.to_string()))?;

    let server = create_server(
        &static_cfg,
        ConfigSource::Cached(static_cfg.clone()),
        Arc::new(runtime),
        state.client.clone(),
    );

    let response = match server.handle_message(message).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };

    drop(scope);
    Ok(response)
}
