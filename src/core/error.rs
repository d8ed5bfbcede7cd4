#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    /// No API key was available when a request was about to be sent
    #[error("Missing API key: set {0} in .env or the environment")]
    MissingApiKey(String),
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(reqwest::Error),
    /// Response parsing errors (missing fields, invalid format)
    #[error("Failed to parse response: {0}")]
    ResponseFormat(String),
    /// Non-success status returned by the gateway
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Stream-related errors
    #[error("Stream error: {0}")]
    StreamError(String),
    /// I/O error
    #[error("I/O error: {0}")]
    IOError(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool not found error
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
    /// Invalid argument error
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl LLMError {
    /// Whether the error should be shown to the user rather than only logged
    pub const fn is_user_visible(&self) -> bool {
        !matches!(self, Self::ResponseFormat(_))
    }
}

impl From<std::io::Error> for LLMError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err.to_string())
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        // Errors carrying a status code came from the gateway, not the socket
        match err.status() {
            Some(status) => Self::Api {
                status: status.as_u16(),
                message: format!("request failed: {status}"),
            },
            None => Self::Network(err),
        }
    }
}
