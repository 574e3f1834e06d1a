use serde::Deserialize;

/// Liveness endpoint for load balancers and orchestrators
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Serve the endpoint at all
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Route answering `ok`
    #[serde(default = "default_health_path")]
    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: enabled_by_default(),
            path: default_health_path(),
        }
    }
}

const fn enabled_by_default() -> bool {
    true
}

fn default_health_path() -> String {
    "/health".to_owned()
}
