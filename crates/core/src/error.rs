//! Error types for configuration loading and request overrides.

use std::path::PathBuf;

/// Errors raised while resolving the static configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or is not valid JSON.
    #[error("Failed to load configuration from {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The JSON document does not match the configuration schema.
    #[error("Invalid configuration in {}: {}", path.display(), fields.join(", "))]
    Validation { path: PathBuf, fields: Vec<String> },
}

impl ConfigError {
    pub(crate) fn load(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Load {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Field paths that failed validation (empty for load errors).
    pub fn fields(&self) -> &[String] {
        match self {
            Self::Validation { fields, .. } => fields,
            Self::Load { .. } => &[],
        }
    }
}

/// A `config` query parameter that could not be decoded.
///
/// Never fatal: the decoder logs it and carries on with an empty object.
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("config parameter is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("config parameter is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parameter must decode to a JSON object")]
    NotAnObject,
}
