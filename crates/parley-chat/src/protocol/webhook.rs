//! Workflow webhook (n8n) wire format

use jiff::Timestamp;
use serde::Serialize;

use crate::types::{Content, Role};

/// `metadata.source` of a rating notification
pub const RATING_SOURCE: &str = "chat-ui-rating";

/// Body posted to the webhook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    /// Text of the last user message
    pub chat_input: String,
    /// Stable per-conversation session identifier
    pub session_id: String,
}

/// Body posted to the webhook when the user rates a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingNotification {
    pub conversation_id: String,
    pub user_id: String,
    /// Rated message id
    pub session_id: String,
    pub message: RatedMessage,
    pub metadata: RatingMetadata,
}

/// The rated message as stored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedMessage {
    pub role: Role,
    pub content: Option<Content>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingMetadata {
    /// When the rating was stored
    pub timestamp: Timestamp,
    /// Always [`RATING_SOURCE`]
    pub source: &'static str,
    pub msgrating: serde_json::Value,
    pub message_id: String,
}

/// Fields checked, in order, for the reply text
const TEXT_KEYS: [&str; 6] = ["output", "answer", "response", "text", "content", "message"];

/// Wrapper keys unwrapped after the text fields are exhausted
const WRAPPER_KEYS: [&str; 2] = ["data", "result"];

/// Extract the assistant reply from an arbitrary webhook payload
///
/// Returns an empty string when no text can be found.
pub fn extract_output(payload: &serde_json::Value) -> String {
    use serde_json::Value;

    match payload {
        Value::Array(items) => items.first().map(extract_output).unwrap_or_default(),
        Value::Object(map) => {
            if let Some(inner) = map.get("json") {
                return extract_output(inner);
            }

            if let Some(text) = TEXT_KEYS.iter().find_map(|key| map.get(*key).and_then(Value::as_str)) {
                return text.to_owned();
            }

            WRAPPER_KEYS
                .iter()
                .find_map(|key| map.get(*key))
                .map(extract_output)
                .unwrap_or_default()
        }
        Value::String(text) => text.clone(),
        _ => String::new(),
    }
}
