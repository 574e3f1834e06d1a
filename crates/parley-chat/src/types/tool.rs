use serde::{Deserialize, Serialize};

use super::message::FunctionCall;

/// Partial description of one function call, as streamed by a provider
///
/// A fragment carrying an `id` starts a new call; one without is a continuation
/// of the call currently in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    /// Call identifier, present only on the first fragment of a call
    pub id: Option<String>,
    /// Function name, usually present only on the first fragment
    pub function_name: Option<String>,
    /// Next slice of the JSON-encoded arguments
    pub arguments_chunk: String,
}

impl ToolCallFragment {
    /// Fragment opening a new call
    pub fn start(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            function_name: Some(name.into()),
            arguments_chunk: arguments.into(),
        }
    }

    /// Fragment continuing the call in progress
    pub fn continuation(arguments: impl Into<String>) -> Self {
        Self {
            id: None,
            function_name: None,
            arguments_chunk: arguments.into(),
        }
    }
}

/// What a streamed chunk says about function calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCallSignal {
    /// The chunk carries one or more call fragments
    Fragments(Vec<ToolCallFragment>),
    /// The chunk explicitly carries no call data
    Absent,
}

/// A fully reassembled function call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCall {
    /// Call identifier
    pub id: String,
    /// Function name
    pub name: String,
    /// Complete JSON-encoded arguments
    pub arguments: String,
}

impl CompletedCall {
    /// The call as an assistant `function_call` payload
    pub fn function_call(&self) -> FunctionCall {
        FunctionCall {
            name: self.name.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

/// A complete (non-streamed) tool call in a full response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Call identifier
    pub id: String,
    /// Requested function
    pub function: FunctionCall,
}

impl From<ToolCall> for CompletedCall {
    fn from(call: ToolCall) -> Self {
        Self {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        }
    }
}

/// Tool definition as published by the function host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool type, `function` in practice
    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,
    /// Function specification
    pub function: FunctionDefinition,
}

/// Function name plus its opaque schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Description, parameters, and anything else the host publishes
    #[serde(flatten)]
    pub schema: serde_json::Map<String, serde_json::Value>,
}

fn default_tool_type() -> String {
    "function".to_owned()
}
