// Core types and configuration handling for the Kirha MCP gateway

pub mod config;
pub mod error;
pub mod merge;
pub mod overrides;
pub mod planning;

pub use config::{
    default_config_path, load_static_config, ApiConfig, ConfigSource, ConfigStrategy, McpInfo,
    StaticConfig, SummarizationConfig, ToolConfig,
};
pub use error::{ConfigError, OverrideError};
pub use merge::{merge, ApiKeySource, EffectiveConfig, RuntimeConfig};
pub use overrides::{decode_overrides, QueryParams, RESERVED_PARAMS};
pub use planning::PlanningRequest;
