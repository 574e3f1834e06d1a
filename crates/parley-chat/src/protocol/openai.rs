//! `OpenAI` / Azure `OpenAI` chat completion wire format types

use serde::{Deserialize, Serialize};

use crate::types::{Content, FunctionCall, ToolDefinition};

// -- Request types --

/// Chat completion request
#[derive(Debug, Clone, Serialize)]
pub struct OpenAiRequest {
    /// Model identifier (ignored by Azure, which routes by deployment)
    pub model: String,
    /// Conversation messages
    pub messages: Vec<OpenAiMessage>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Whether to stream the response
    pub stream: bool,
    /// Function definitions offered to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Retrieval data sources (Azure "on your data")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_sources: Option<Vec<serde_json::Value>>,
    /// End-user security context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_security_context: Option<UserSecurityContext>,
}

/// Message within a request
#[derive(Debug, Clone, Serialize)]
pub struct OpenAiMessage {
    /// Message role
    pub role: String,
    /// Content, serialized as `null` when absent
    pub content: Option<Content>,
    /// Function name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function call requested by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// Retrieval context, as an object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

/// End-user context attached for content safety auditing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSecurityContext {
    /// Application name
    pub application_name: String,
    /// Resolved end-user identifier
    pub end_user_id: String,
    /// Client address, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
}

// -- Response types --

/// Full chat completion response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiResponse {
    /// Completion identifier
    #[serde(default)]
    pub id: String,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Unix seconds
    #[serde(default)]
    pub created: u64,
    /// Completion choices
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
}

/// One choice of a full response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    /// Generated message
    pub message: OpenAiResponseMessage,
}

/// Message within a full response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiResponseMessage {
    /// Text content
    #[serde(default)]
    pub content: Option<String>,
    /// Retrieval context
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    /// Requested tool calls
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,
}

/// Tool call within a full response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiToolCall {
    /// Call identifier
    pub id: String,
    /// Requested function
    pub function: FunctionCall,
}

// -- Streaming types --

/// One `data:` event of a streamed response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiStreamChunk {
    /// Completion identifier
    #[serde(default)]
    pub id: String,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Unix seconds
    #[serde(default)]
    pub created: u64,
    /// Choices; empty for Azure's leading prompt-filter event
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
}

/// One choice of a stream chunk
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiStreamChoice {
    /// Incremental content
    #[serde(default)]
    pub delta: OpenAiStreamDelta,
}

/// Incremental content within a stream choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiStreamDelta {
    /// Text fragment
    #[serde(default)]
    pub content: Option<String>,
    /// Retrieval context
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    /// Tool call fragments
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

/// Tool call fragment within a stream delta
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiStreamToolCall {
    /// Position in the `tool_calls` array
    #[serde(default)]
    pub index: u32,
    /// Call identifier (first fragment only)
    #[serde(default)]
    pub id: Option<String>,
    /// Partial function data
    #[serde(default)]
    pub function: Option<OpenAiStreamFunction>,
}

/// Partial function data within a streamed tool call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiStreamFunction {
    /// Function name (first fragment only)
    #[serde(default)]
    pub name: Option<String>,
    /// Next arguments slice
    #[serde(default)]
    pub arguments: Option<String>,
}
