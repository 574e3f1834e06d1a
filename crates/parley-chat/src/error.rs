use http::StatusCode;
use parley_core::HttpError;
use thiserror::Error;

/// Fixed text shown to the end user when a turn cannot be completed
pub const APOLOGY_MESSAGE: &str = "I'm sorry, but I encountered an error processing your request. Please try again. If the problem persists, please start a new conversation.";

/// Shown instead of [`APOLOGY_MESSAGE`] when the upstream did not answer in time
pub const TIMEOUT_MESSAGE: &str =
    "I'm sorry, the service took too long to respond. Please try again in a moment.";

/// Errors that can occur while serving a conversation turn
#[derive(Debug, Error)]
pub enum ChatError {
    /// Required provider settings are missing or invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport failure, non-2xx response, or malformed payload
    #[error("upstream error: {message}")]
    Upstream {
        /// HTTP status returned by the upstream, when one was received
        status: Option<u16>,
        /// Diagnostic detail, never shown to the end user
        message: String,
    },

    /// Bounded wait on an upstream exchange expired
    #[error("upstream request timed out")]
    Timeout,

    /// Remote function execution failed
    #[error(transparent)]
    Function(#[from] FunctionError),

    /// Client request is missing required fields
    #[error("{0}")]
    Validation(String),

    /// Requested resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Errors raised by the remote function invoker
#[derive(Debug, Error)]
pub enum FunctionError {
    /// Name is not in the function registry; the call is dropped
    #[error("unknown function: {0}")]
    Unknown(String),

    /// Function host rejected or failed the call; the turn is aborted
    #[error("function '{name}' failed: {message}")]
    Failed {
        /// Function name
        name: String,
        /// Diagnostic detail
        message: String,
    },
}

impl ChatError {
    /// Build an upstream error from a status and message
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Map a `reqwest` transport error, keeping timeouts distinct
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::upstream(error.status().map(|s| s.as_u16()), error.to_string())
        }
    }

    /// Client-safe text substituted for the assistant reply when a turn fails
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Timeout => TIMEOUT_MESSAGE,
            _ => APOLOGY_MESSAGE,
        }
    }
}

impl HttpError for ChatError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { .. } | Self::Function(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Configuration(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Upstream { .. } => "upstream_error",
            Self::Timeout => "timeout_error",
            Self::Function(_) => "function_error",
            Self::Validation(_) => "invalid_request_error",
            Self::NotFound(_) => "not_found_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::NotFound(message) => message.clone(),
            Self::Configuration(_) | Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.user_message().to_owned(),
        }
    }
}
