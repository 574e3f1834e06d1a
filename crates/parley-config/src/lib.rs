#![allow(clippy::must_use_candidate)]

pub mod chat;
pub mod cors;
mod env;
pub mod health;
pub mod history;
mod loader;
pub mod server;
pub mod telemetry;
pub mod ui;

use serde::Deserialize;

pub use chat::*;
pub use cors::*;
pub use health::*;
pub use history::*;
pub use server::*;
pub use telemetry::*;
pub use ui::*;

/// Top-level Parley configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat provider configuration
    #[serde(default)]
    pub chat: ChatConfig,
    /// Conversation history configuration
    #[serde(default)]
    pub history: HistoryConfig,
    /// Frontend-facing settings
    #[serde(default)]
    pub ui: UiConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Deserialize a human-readable duration such as `"30s"` or `"2m"`
pub(crate) fn deserialize_duration<'de, D>(deserializer: D) -> Result<std::time::Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}
