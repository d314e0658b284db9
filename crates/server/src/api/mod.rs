use crate::config::{AppState, ServerConfig};
use anyhow::Result;
use axum::{
    body::Body,
    http::{header::HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use kirha_mcp::protocol::{JsonRpcError, JsonRpcResponse, SERVER_ERROR};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

mod handlers;

/// Start the HTTP server and run until SIGINT/SIGTERM
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::new(&config).await?;
    let app = create_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("MCP Streamable HTTP Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/mcp",
            get(handlers::handle_mcp)
                .post(handlers::handle_mcp)
                .delete(handlers::handle_mcp),
        )
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new())
                        .on_response(DefaultOnResponse::new()),
                )
                .layer(cors_layer())
                .layer(CatchPanicLayer::custom(internal_error)),
        )
        .with_state(Arc::new(state))
}

/// Any origin; browser clients need to read `Mcp-Session-Id`
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods(cors::Any)
        .allow_headers(cors::Any)
        .expose_headers([HeaderName::from_static("mcp-session-id")])
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Error returned by the MCP endpoint before a JSON-RPC response exists
#[derive(Debug)]
pub enum McpHttpError {
    /// Body is not JSON
    Parse(String),
    /// No server-initiated stream in stateless mode
    MethodNotAllowed,
    Internal,
}

impl IntoResponse for McpHttpError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::Parse(message) => (
                StatusCode::BAD_REQUEST,
                JsonRpcError::parse_error(format!("Parse error: {}", message)),
            ),
            Self::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                JsonRpcError::custom(SERVER_ERROR, "Method not allowed."),
            ),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                JsonRpcError::internal_error("Internal server error"),
            ),
        };

        (status, Json(JsonRpcResponse::error(Value::Null, error))).into_response()
    }
}

pub type McpResult<T> = std::result::Result<T, McpHttpError>;

fn internal_error(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail, "Error handling MCP request");

    McpHttpError::Internal.into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down server...");
}
