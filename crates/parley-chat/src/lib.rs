//! Chat-completion core for Parley
//!
//! Drives one conversation turn against an interchangeable backend (an
//! OpenAI-compatible LLM API or a workflow webhook), reassembles streamed
//! function calls, executes them against a remote function host, and
//! normalizes everything into a single response envelope.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod accumulator;
pub mod convert;
pub mod error;
pub mod format;
pub mod functions;
pub mod history;
pub mod orchestrator;
pub mod protocol;
pub mod provider;
pub mod redact;
#[cfg(feature = "http")]
pub mod router;
pub mod session;
pub mod types;

pub use accumulator::{AccumulatorState, StreamStatus, Transition};
pub use error::{ChatError, FunctionError};
pub use functions::{FunctionInvoker, FunctionRegistry, RemoteFunctionInvoker};
pub use history::{ConversationStore, MemoryConversationStore};
pub use orchestrator::{Orchestrator, Turn};
pub use provider::{ChatProvider, ChunkStream};
#[cfg(feature = "http")]
pub use router::{ChatState, chat_router};
pub use session::{ConversationSessionStore, MemorySessionStore, SessionStore};
pub use types::{ChatRequest, CompletionChunk, CompletionResponse, Message, NormalizedResponse, Role};
