use serde::Deserialize;

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Output format for log lines
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

/// Log line encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

fn default_log_filter() -> String {
    "info".to_owned()
}
