//! Conversion of provider output into the response envelope

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use crate::error::ChatError;
use crate::types::{
    CompletionChunk, CompletionResponse, EnvelopeChoice, EnvelopeMessage, NormalizedResponse, ResponseObject, Role,
};

/// Metadata echoed back on every envelope
pub type HistoryMetadata = Map<String, Value>;

/// Envelope for one streamed chunk
///
/// Retrieval context takes precedence over text and is sent as a `tool`
/// message. Returns `None` when the chunk has neither.
pub fn format_chunk(
    chunk: &CompletionChunk,
    history_metadata: &HistoryMetadata,
    upstream_request_id: Option<&str>,
) -> Option<NormalizedResponse> {
    let delta = chunk.delta.as_ref()?;

    let message = if let Some(context) = &delta.context {
        EnvelopeMessage {
            role: Role::Tool,
            content: context.to_string(),
        }
    } else {
        EnvelopeMessage {
            role: Role::Assistant,
            content: delta.content.clone().filter(|text| !text.is_empty())?,
        }
    };

    Some(envelope(
        chunk.id.clone(),
        chunk.model.clone(),
        chunk.created,
        ResponseObject::Chunk,
        vec![message],
        history_metadata,
        upstream_request_id,
    ))
}

/// Envelope for a full completion: optional `tool` context message, then the assistant reply
pub fn format_completion(response: &CompletionResponse, history_metadata: &HistoryMetadata) -> NormalizedResponse {
    let mut messages = Vec::with_capacity(2);

    if let Some(message) = &response.message {
        if let Some(context) = &message.context {
            messages.push(EnvelopeMessage {
                role: Role::Tool,
                content: context.to_string(),
            });
        }

        messages.push(EnvelopeMessage {
            role: Role::Assistant,
            content: message.content.clone().unwrap_or_default(),
        });
    }

    envelope(
        response.id.clone(),
        response.model.clone(),
        response.created,
        ResponseObject::Completion,
        messages,
        history_metadata,
        response.upstream_request_id.as_deref(),
    )
}

/// Envelope carrying the client-safe text for a failed turn
pub fn format_error(
    error: &ChatError,
    model: &str,
    object: ResponseObject,
    history_metadata: &HistoryMetadata,
) -> NormalizedResponse {
    envelope(
        uuid::Uuid::new_v4().to_string(),
        model.to_owned(),
        unix_now(),
        object,
        vec![EnvelopeMessage {
            role: Role::Assistant,
            content: error.user_message().to_owned(),
        }],
        history_metadata,
        None,
    )
}

fn envelope(
    id: String,
    model: String,
    created: u64,
    object: ResponseObject,
    messages: Vec<EnvelopeMessage>,
    history_metadata: &HistoryMetadata,
    upstream_request_id: Option<&str>,
) -> NormalizedResponse {
    NormalizedResponse {
        id,
        model,
        created,
        object,
        choices: vec![EnvelopeChoice { messages }],
        history_metadata: history_metadata.clone(),
        upstream_request_id: upstream_request_id.map(str::to_owned),
    }
}

/// Current time in unix seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
