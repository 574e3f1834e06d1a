use http::StatusCode;
use serde::Serialize;

/// Domain error with an HTTP rendering
///
/// The router turns these into `{"error": ...}` responses; the domain
/// crates never see axum types.
pub trait HttpError: std::error::Error {
    /// Response status
    fn status_code(&self) -> StatusCode;

    /// Stable machine-readable kind, used in logs
    fn error_type(&self) -> &str;

    /// Text safe to show the client; internal detail stays in logs
    fn client_message(&self) -> String;

    /// JSON body of the error response
    fn error_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.client_message(),
        }
    }
}

/// Error response payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Client-safe message
    pub error: String,
}
