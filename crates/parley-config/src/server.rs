use std::net::SocketAddr;

use serde::Deserialize;

use crate::{cors::CorsConfig, health::HealthConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// How the end user is resolved from request headers
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Header set by the authenticating proxy
    #[serde(default = "default_header")]
    pub header: String,
    /// User id assumed when the header is absent
    #[serde(default = "default_user")]
    pub default_user: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            header: default_header(),
            default_user: default_user(),
        }
    }
}

fn default_header() -> String {
    "x-ms-client-principal-id".to_owned()
}

fn default_user() -> String {
    "00000000-0000-0000-0000-000000000000".to_owned()
}
