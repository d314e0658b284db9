// Standalone MCP server binary (stdio transport)

use anyhow::{Context, Result};
use clap::Parser;
use kirha_client::PlanningClient;
use kirha_core::{ConfigSource, ConfigStrategy, RuntimeConfig};
use kirha_mcp::create_server;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "kirha-mcp", version)]
#[command(about = "Kirha tool-planning MCP server over stdio", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// API key for tool planning
    #[arg(long, env = "API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Path to a custom configuration file
    #[arg(long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// When to read the configuration file: cache or reload
    #[arg(long, env = "CONFIG_STRATEGY", default_value = "cache")]
    config_strategy: ConfigStrategy,
}

const MISSING_KEY_MESSAGE: &str =
    "Error: API key is required. Set API_KEY environment variable or use --api-key";

/// The stdio server refuses to start without a process-level key
fn require_api_key(args: &Args) -> Result<&str, &'static str> {
    if args.api_key.is_empty() {
        Err(MISSING_KEY_MESSAGE)
    } else {
        Ok(&args.api_key)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the protocol
    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let api_key = match require_api_key(&args) {
        Ok(key) => key.to_string(),
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(1);
        }
    };

    let source = ConfigSource::open(args.config_strategy, args.config.clone())
        .await
        .context("Failed to start MCP server")?;
    let static_cfg = source.load().await.context("Failed to start MCP server")?;

    let runtime = Arc::new(RuntimeConfig::new(api_key, args.debug, args.config));
    let client = PlanningClient::new().context("Failed to create HTTP client")?;
    let server = create_server(&static_cfg, source, runtime, client);

    if args.debug {
        tracing::info!(
            server = %server.info().name,
            strategy = %args.config_strategy,
            tools = server.registry().len(),
            "MCP server started successfully"
        );
    }

    server.serve_stdio().await?;

    Ok(())
}
