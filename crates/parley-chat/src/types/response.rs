use serde::{Deserialize, Serialize};

use super::message::Role;
use super::tool::ToolCall;

/// Complete (non-streamed) upstream completion, provider-agnostic
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Upstream completion identifier
    pub id: String,
    /// Model that produced the completion
    pub model: String,
    /// Unix seconds
    pub created: u64,
    /// First choice's message, if any
    pub message: Option<ResponseMessage>,
    /// Upstream request id (Azure `apim-request-id`)
    pub upstream_request_id: Option<String>,
}

/// Message of the first choice of a full completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMessage {
    /// Assistant text
    pub content: Option<String>,
    /// Retrieval context (citations)
    pub context: Option<serde_json::Value>,
    /// Requested function calls
    pub tool_calls: Vec<ToolCall>,
}

impl CompletionResponse {
    /// Function calls requested by this completion
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message.as_ref().map_or(&[], |m| m.tool_calls.as_slice())
    }
}

/// `object` discriminator of the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseObject {
    /// Single-object response
    #[serde(rename = "chat.completion")]
    Completion,
    /// One line of a streamed response
    #[serde(rename = "chat.completion.chunk")]
    Chunk,
}

/// The canonical response envelope, the only shape exposed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResponse {
    /// Completion identifier
    pub id: String,
    /// Model name
    pub model: String,
    /// Unix seconds
    pub created: u64,
    /// Completion or chunk
    pub object: ResponseObject,
    /// Always exactly one choice
    pub choices: Vec<EnvelopeChoice>,
    /// Echo of the request's history metadata
    #[serde(default)]
    pub history_metadata: serde_json::Map<String, serde_json::Value>,
    /// Upstream request id, null when unknown
    #[serde(rename = "apim-request-id", default)]
    pub upstream_request_id: Option<String>,
}

/// One choice of the envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeChoice {
    /// Messages produced in this step
    pub messages: Vec<EnvelopeMessage>,
}

/// Message within an envelope choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMessage {
    /// `assistant`, or `tool` for JSON-encoded retrieval context
    pub role: Role,
    /// Text content
    pub content: String,
}

impl NormalizedResponse {
    /// Concatenated assistant text of the first choice
    pub fn assistant_text(&self) -> String {
        self.choices
            .iter()
            .flat_map(|c| &c.messages)
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
            .collect()
    }
}
