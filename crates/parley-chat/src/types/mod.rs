//! Provider-agnostic conversation types
//!
//! Upstream wire formats convert into these; the response envelope is the
//! only shape that crosses the system boundary.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{Content, ContentPart, FunctionCall, Message, Role};
pub use request::ChatRequest;
pub use response::{
    CompletionResponse, EnvelopeChoice, EnvelopeMessage, NormalizedResponse, ResponseMessage, ResponseObject,
};
pub use stream::{ChunkDelta, CompletionChunk};
pub use tool::{CompletedCall, FunctionDefinition, ToolCall, ToolCallFragment, ToolCallSignal, ToolDefinition};
