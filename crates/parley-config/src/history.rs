use serde::Deserialize;

/// Conversation history persistence
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Persist conversations and expose the `/history` endpoints
    #[serde(default)]
    pub enabled: bool,
    /// Maximum conversations returned by one list call
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            page_size: default_page_size(),
        }
    }
}

const fn default_page_size() -> usize {
    25
}
