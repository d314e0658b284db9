//! Error types for tool-planning calls.

/// Result type for planning operations.
pub type PlanningResult<T> = Result<T, PlanningError>;

/// Error types that can occur when calling the planning API.
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    /// No API key was resolved for the call.
    #[error(
        "API key is required. Provide an apiKey parameter, use --api-key, \
         or set the API_KEY environment variable"
    )]
    MissingApiKey,

    /// The API answered with a non-success status.
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    /// The request never completed (connection, DNS, timeout, body read).
    #[error("{}", describe(.0))]
    Network(#[from] reqwest::Error),

    /// The response body is not valid JSON.
    #[error("Invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured endpoint is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The API key cannot be sent as a header value.
    #[error("Invalid API key format")]
    InvalidApiKey,
}

impl PlanningError {
    /// HTTP status of an upstream rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            _ => None,
        }
    }
}

/// reqwest's top-level message omits the cause; append the source chain.
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_message() {
        let err = PlanningError::Http { status: 500 };
        assert_eq!(err.to_string(), "HTTP error! status: 500");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_missing_key_message() {
        let err = PlanningError::MissingApiKey;
        assert!(err.to_string().starts_with("API key is required"));
        assert_eq!(err.status(), None);
    }
}
