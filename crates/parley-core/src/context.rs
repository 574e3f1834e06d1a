use crate::identity::UserIdentity;

/// Runtime context for a chat request
///
/// Built once per request by the server middleware and handed to the
/// orchestrator and history handlers
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP request parts (method, URI, headers, extensions)
    pub parts: http::request::Parts,
    /// Resolved end user
    pub user: UserIdentity,
}

impl RequestContext {
    /// Create a minimal context for embedded (non-HTTP) use
    ///
    /// Contains empty headers and the given user
    pub fn empty(user: UserIdentity) -> Self {
        let (parts, ()) = http::Request::builder()
            .method(http::Method::GET)
            .uri("/")
            .body(())
            .expect("valid minimal request")
            .into_parts();

        Self { parts, user }
    }

    /// Access request headers
    pub fn headers(&self) -> &http::HeaderMap {
        &self.parts.headers
    }

    /// Opaque user identifier
    pub fn user_id(&self) -> &str {
        &self.user.principal_id
    }

    /// First hop of `x-forwarded-for`, if present
    pub fn client_ip(&self) -> Option<&str> {
        self.headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    }
}
