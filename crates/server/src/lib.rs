// Streamable-HTTP host for the Kirha MCP gateway

pub mod api;
pub mod config;

pub use api::{create_router, serve};
pub use config::{AppState, ServerConfig};
