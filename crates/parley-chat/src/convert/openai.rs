//! Conversion between internal types and the `OpenAI` wire format

use crate::protocol::openai::{OpenAiMessage, OpenAiResponse, OpenAiStreamChunk, OpenAiStreamToolCall};
use crate::types::{ChunkDelta, CompletionChunk, CompletionResponse, Message, ResponseMessage, Role, ToolCall, ToolCallFragment};

// -- Outbound: internal types -> OpenAI wire format --

/// Build the upstream message list
///
/// The system prompt, when given, is prepended. User messages carry only
/// role and content; assistant and function messages also keep their name,
/// function call, and retrieval context. Other roles are not sent.
pub fn outgoing_messages(messages: &[Message], system_message: Option<&str>) -> Vec<OpenAiMessage> {
    let system = system_message.map(|text| OpenAiMessage {
        role: "system".to_owned(),
        content: Some(crate::types::Content::Text(text.to_owned())),
        name: None,
        function_call: None,
        context: None,
    });

    let conversation = messages.iter().filter_map(|message| match message.role {
        Role::User => Some(OpenAiMessage {
            role: "user".to_owned(),
            content: message.content.clone(),
            name: None,
            function_call: None,
            context: None,
        }),
        Role::Assistant | Role::Function => Some(OpenAiMessage {
            role: if message.role == Role::Assistant { "assistant" } else { "function" }.to_owned(),
            content: message.content.clone(),
            name: message.name.clone(),
            function_call: message.function_call.clone(),
            context: message.context.as_ref().and_then(context_object),
        }),
        Role::System | Role::Tool => None,
    });

    system.into_iter().chain(conversation).collect()
}

/// History stores context as a JSON string; upstream expects an object
fn context_object(context: &serde_json::Value) -> Option<serde_json::Value> {
    match context {
        serde_json::Value::String(raw) => match serde_json::from_str(raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!(error = %e, "dropping unparseable message context");
                None
            }
        },
        other => Some(other.clone()),
    }
}

// -- Inbound: OpenAI wire format -> internal types --

impl From<OpenAiStreamChunk> for CompletionChunk {
    fn from(chunk: OpenAiStreamChunk) -> Self {
        let delta = chunk.choices.into_iter().next().map(|choice| ChunkDelta {
            content: choice.delta.content,
            context: choice.delta.context,
            tool_calls: choice
                .delta
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(Into::into)
                .collect(),
        });

        Self {
            id: chunk.id,
            model: chunk.model,
            created: chunk.created,
            delta,
        }
    }
}

impl From<OpenAiStreamToolCall> for ToolCallFragment {
    fn from(call: OpenAiStreamToolCall) -> Self {
        let function = call.function.unwrap_or_default();

        Self {
            id: call.id.filter(|id| !id.is_empty()),
            function_name: function.name.filter(|name| !name.is_empty()),
            arguments_chunk: function.arguments.unwrap_or_default(),
        }
    }
}

impl From<OpenAiResponse> for CompletionResponse {
    fn from(response: OpenAiResponse) -> Self {
        let message = response.choices.into_iter().next().map(|choice| ResponseMessage {
            content: choice.message.content,
            context: choice.message.context,
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    function: call.function,
                })
                .collect(),
        });

        Self {
            id: response.id,
            model: response.model,
            created: response.created,
            message,
            upstream_request_id: None,
        }
    }
}
