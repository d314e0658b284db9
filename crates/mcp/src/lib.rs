// MCP (Model Context Protocol) server exposing the tool-planning tool

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::{create_server, McpServer};
