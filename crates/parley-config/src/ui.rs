use serde::Deserialize;

/// Settings surfaced to the chat frontend
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UiConfig {
    /// Application title
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { title: default_title() }
    }
}

fn default_title() -> String {
    "Parley".to_owned()
}
