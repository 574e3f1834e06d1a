//! Reassembly of function calls fragmented across a streamed completion
//!
//! [`AccumulatorState`] is a value: every chunk's [`ToolCallSignal`] is fed
//! through [`AccumulatorState::ingest`], which returns the next state and a
//! [`Transition`] telling the caller what to do with the chunk. Executing the
//! calls is left to the caller, who records each result with
//! [`AccumulatorState::record_result`] before the second round-trip.

use crate::types::{CompletedCall, Message, ToolCallFragment, ToolCallSignal};

/// Progress of function-call detection within one streamed turn
///
/// Only ever moves forward: `Initial` to `Streaming` to `Completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamStatus {
    /// No call fragment seen yet; chunks are plain text
    #[default]
    Initial,
    /// Call fragments are arriving
    Streaming,
    /// All calls were reassembled
    Completed,
}

/// What the caller should do with the chunk just ingested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Plain text chunk, forward it to the client
    Emit,
    /// Part of a function call, hold it back
    Buffer,
    /// Every call is complete; execute them in order, then re-send.
    /// Produced at most once per state.
    CallsReady(Vec<CompletedCall>),
    /// The turn already completed, nothing to do
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InProgressCall {
    id: String,
    name: Option<String>,
    arguments: String,
}

impl InProgressCall {
    fn finalize(self) -> CompletedCall {
        CompletedCall {
            id: self.id,
            name: self.name.unwrap_or_default(),
            arguments: self.arguments,
        }
    }
}

/// Function-call stream state for one turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatorState {
    status: StreamStatus,
    in_progress: Option<InProgressCall>,
    last_name: Option<String>,
    completed_calls: Vec<CompletedCall>,
    synthesized_messages: Vec<Message>,
}

impl AccumulatorState {
    /// Fresh state for a new streamed turn
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status
    pub const fn status(&self) -> StreamStatus {
        self.status
    }

    /// Calls finalized so far, in call-start order
    pub fn completed_calls(&self) -> &[CompletedCall] {
        &self.completed_calls
    }

    /// Messages recorded for executed calls, in execution order
    pub fn synthesized_messages(&self) -> &[Message] {
        &self.synthesized_messages
    }

    /// Take the recorded messages to splice into the conversation
    pub fn into_synthesized_messages(self) -> Vec<Message> {
        self.synthesized_messages
    }

    /// Feed the signal carried by one chunk
    ///
    /// An empty fragment list counts as the no-calls signal.
    pub fn ingest(mut self, signal: ToolCallSignal) -> (Self, Transition) {
        let fragments = match signal {
            ToolCallSignal::Fragments(fragments) if !fragments.is_empty() => fragments,
            _ => {
                return match self.status {
                    StreamStatus::Initial => (self, Transition::Emit),
                    StreamStatus::Streaming => self.complete(),
                    StreamStatus::Completed => (self, Transition::Ignore),
                };
            }
        };

        if self.status == StreamStatus::Completed {
            return (self, Transition::Ignore);
        }

        self.status = StreamStatus::Streaming;
        for fragment in fragments {
            self.apply(fragment);
        }

        (self, Transition::Buffer)
    }

    /// Signal the end of the upstream stream
    ///
    /// A stream may end without an explicit no-calls chunk; a call still in
    /// progress is finalized exactly as if one had arrived.
    pub fn finish(self) -> (Self, Transition) {
        match self.status {
            StreamStatus::Streaming => self.complete(),
            StreamStatus::Initial | StreamStatus::Completed => (self, Transition::Ignore),
        }
    }

    /// Record the result of an executed call as two synthesized messages
    pub fn record_result(mut self, call: &CompletedCall, result: String) -> Self {
        self.synthesized_messages.extend(synthesize_messages(call, result));
        self
    }

    fn apply(&mut self, fragment: ToolCallFragment) {
        if let Some(name) = &fragment.function_name {
            self.last_name = Some(name.clone());
        }

        match fragment.id {
            Some(id) => {
                if let Some(previous) = self.in_progress.take() {
                    self.completed_calls.push(previous.finalize());
                }

                self.in_progress = Some(InProgressCall {
                    id,
                    name: fragment.function_name.or_else(|| self.last_name.clone()),
                    arguments: fragment.arguments_chunk,
                });
            }
            None => match self.in_progress.as_mut() {
                Some(call) => {
                    if call.name.is_none() {
                        call.name = fragment.function_name;
                    }
                    call.arguments.push_str(&fragment.arguments_chunk);
                }
                None => {
                    tracing::debug!(
                        arguments = %fragment.arguments_chunk,
                        "dropping call continuation without a call start"
                    );
                }
            },
        }
    }

    fn complete(mut self) -> (Self, Transition) {
        if let Some(last) = self.in_progress.take() {
            self.completed_calls.push(last.finalize());
        }

        self.status = StreamStatus::Completed;
        let calls = self.completed_calls.clone();

        (self, Transition::CallsReady(calls))
    }
}

/// The assistant `function_call` message and the function result message for one call
pub fn synthesize_messages(call: &CompletedCall, result: String) -> [Message; 2] {
    [
        Message::function_call(call.function_call()),
        Message::function_result(call.name.clone(), result, Some(call.id.clone()).filter(|id| !id.is_empty())),
    ]
}
