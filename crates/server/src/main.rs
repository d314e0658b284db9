use anyhow::Result;
use clap::Parser;
use kirha_core::ConfigStrategy;
use kirha_server::{serve, ServerConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kirha-server", version)]
#[command(about = "Kirha tool-planning MCP server over streamable HTTP", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Default API key for requests without an apiKey parameter
    #[arg(long, env = "API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Enable debug logging (DEBUG=true)
    #[arg(long, env = "DEBUG", value_parser = parse_debug_flag)]
    debug: bool,

    /// Path to a custom configuration file
    #[arg(long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// When to read the configuration file: cache or reload
    #[arg(long, env = "CONFIG_STRATEGY", default_value = "reload")]
    config_strategy: ConfigStrategy,
}

/// Only the literal `true` switches debug on
fn parse_debug_flag(value: &str) -> Result<bool, String> {
    Ok(value == "true")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug {
        "debug,tower_http=debug"
    } else {
        "info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_target(false)
        .init();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        api_key: args.api_key,
        debug: args.debug,
        config_path: args.config,
        config_strategy: args.config_strategy,
    };

    tracing::info!(?config, "Starting Kirha MCP gateway");

    serve(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_parsing() {
        assert_eq!(parse_debug_flag("true"), Ok(true));
        assert_eq!(parse_debug_flag("false"), Ok(false));
        assert_eq!(parse_debug_flag("1"), Ok(false));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "kirha-server",
            "--port",
            "9000",
            "--debug",
            "--config-strategy",
            "cache",
        ])
        .unwrap();

        assert_eq!(args.port, 9000);
        assert!(args.debug);
        assert_eq!(args.config_strategy, ConfigStrategy::CacheAtStartup);
    }
}
