use super::tool::{ToolCallFragment, ToolCallSignal};

/// One incremental unit of a streamed completion, provider-agnostic
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionChunk {
    /// Upstream completion identifier
    pub id: String,
    /// Model that produced the chunk
    pub model: String,
    /// Unix seconds
    pub created: u64,
    /// First choice's delta; `None` when the chunk carried no choices
    pub delta: Option<ChunkDelta>,
}

/// Incremental content of the first choice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkDelta {
    /// Text fragment
    pub content: Option<String>,
    /// Retrieval context (citations)
    pub context: Option<serde_json::Value>,
    /// Function call fragments
    pub tool_calls: Vec<ToolCallFragment>,
}

impl CompletionChunk {
    /// Function-call signal carried by this chunk
    ///
    /// Returns `None` for a chunk with no choices, which says nothing either way.
    pub fn tool_call_signal(&self) -> Option<ToolCallSignal> {
        let delta = self.delta.as_ref()?;

        if delta.tool_calls.is_empty() {
            Some(ToolCallSignal::Absent)
        } else {
            Some(ToolCallSignal::Fragments(delta.tool_calls.clone()))
        }
    }
}
