//! End-user identity resolved from trusted proxy headers

use http::HeaderMap;
use serde::Serialize;

/// Header carrying the authenticated principal id
pub const PRINCIPAL_ID_HEADER: &str = "x-ms-client-principal-id";

/// Header carrying the authenticated principal display name
pub const PRINCIPAL_NAME_HEADER: &str = "x-ms-client-principal-name";

/// Authenticated end user as seen by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    /// Opaque, stable user identifier
    pub principal_id: String,
    /// Display name, when the proxy provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_name: Option<String>,
}

impl UserIdentity {
    /// Identity with only an id
    pub fn new(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            principal_name: None,
        }
    }
}

/// Resolve the user from request headers
///
/// `id_header` names the header holding the principal id. When it is
/// missing or empty the `default_user` id is used, which keeps local
/// development working without an authenticating proxy in front.
pub fn resolve_user(headers: &HeaderMap, id_header: &str, default_user: &str) -> UserIdentity {
    let principal_id = header_str(headers, id_header).unwrap_or(default_user).to_owned();
    let principal_name = header_str(headers, PRINCIPAL_NAME_HEADER).map(str::to_owned);

    UserIdentity {
        principal_id,
        principal_name,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
