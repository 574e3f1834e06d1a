//! Top-level driver of one conversation turn
//!
//! Streaming turns are a lazy sequence of envelopes: nothing is requested
//! upstream until the first envelope is polled, and dropping the sequence
//! drops the upstream connection with it.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};

use crate::accumulator::{AccumulatorState, Transition};
use crate::error::{ChatError, FunctionError};
use crate::format::{HistoryMetadata, format_chunk, format_completion, format_error};
use crate::functions::FunctionInvoker;
use crate::provider::{ChatProvider, ChunkStream};
use crate::types::{ChatRequest, CompletedCall, CompletionResponse, NormalizedResponse, ResponseObject, Role};

/// Function-call rounds executed per turn; calls requested after that are not run
const MAX_FUNCTION_ROUNDS: usize = 1;

/// Envelopes of one streamed turn
pub type EnvelopeStream = Pin<Box<dyn Stream<Item = NormalizedResponse> + Send>>;

/// One conversation turn as received from the client
#[derive(Debug, Clone)]
pub struct Turn {
    /// Normalized provider input
    pub request: ChatRequest,
    /// Metadata echoed back on every envelope
    pub history_metadata: HistoryMetadata,
}

/// Drives the provider, function execution, and response formatting
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn ChatProvider>,
    invoker: Option<Arc<dyn FunctionInvoker>>,
}

impl Orchestrator {
    /// Create an orchestrator; without an invoker every function call is dropped
    pub fn new(provider: Arc<dyn ChatProvider>, invoker: Option<Arc<dyn FunctionInvoker>>) -> Self {
        Self { provider, invoker }
    }

    /// Name of the active provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Answer the turn in one envelope
    ///
    /// Failures are answered with the apology envelope, never an error.
    pub async fn complete(&self, turn: Turn) -> NormalizedResponse {
        let Turn {
            mut request,
            history_metadata,
        } = turn;
        strip_tool_messages(&mut request);

        match self.try_complete(&mut request).await {
            Ok(response) => format_completion(&response, &history_metadata),
            Err(e) => {
                tracing::error!(provider = %self.provider.name(), error = %e, "conversation turn failed");
                format_error(&e, self.provider.name(), ResponseObject::Completion, &history_metadata)
            }
        }
    }

    async fn try_complete(&self, request: &mut ChatRequest) -> Result<CompletionResponse, ChatError> {
        let first = self.provider.complete(request).await?;

        if first.tool_calls().is_empty() {
            return Ok(first);
        }

        let calls: Vec<CompletedCall> = first.tool_calls().iter().cloned().map(Into::into).collect();
        let state = self.execute(AccumulatorState::new(), &calls).await?;
        if state.synthesized_messages().is_empty() {
            tracing::warn!(count = calls.len(), "no function produced a result, skipping retry");
            return Ok(first);
        }
        request.messages.extend(state.into_synthesized_messages());

        // Calls requested by the retry are returned to the client unexecuted
        self.provider.complete(request).await
    }

    /// Answer the turn as a lazy sequence of chunk envelopes
    ///
    /// A failure at any point ends the sequence with one apology envelope.
    pub fn stream(&self, turn: Turn) -> EnvelopeStream {
        let Turn {
            mut request,
            history_metadata,
        } = turn;
        strip_tool_messages(&mut request);

        let state = StreamTurn {
            orchestrator: self.clone(),
            request,
            history_metadata,
            phase: Phase::Connect { round: 0 },
            emitted: false,
        };

        Box::pin(futures_util::stream::unfold(state, StreamTurn::next))
    }

    /// Run each call in order, recording results into `state`
    ///
    /// Calls to unknown functions are dropped; any other failure aborts.
    async fn execute(
        &self,
        mut state: AccumulatorState,
        calls: &[CompletedCall],
    ) -> Result<AccumulatorState, ChatError> {
        for call in calls {
            let Some(invoker) = &self.invoker else {
                tracing::warn!(function = %call.name, "function calling disabled, dropping call");
                continue;
            };

            match invoker.invoke(&call.name, &call.arguments).await {
                Ok(result) => state = state.record_result(call, result),
                Err(FunctionError::Unknown(name)) => {
                    tracing::warn!(function = %name, "dropping call to unknown function");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(state)
    }
}

/// Tool-role messages are a history artifact and never go upstream
fn strip_tool_messages(request: &mut ChatRequest) {
    request.messages.retain(|message| message.role != Role::Tool);
}

enum Phase {
    Connect {
        round: usize,
    },
    Streaming {
        chunks: ChunkStream,
        accumulator: AccumulatorState,
        round: usize,
    },
    Done,
}

struct StreamTurn {
    orchestrator: Orchestrator,
    request: ChatRequest,
    history_metadata: HistoryMetadata,
    phase: Phase,
    /// Whether any envelope has been yielded; a turn never ends without one
    emitted: bool,
}

impl StreamTurn {
    async fn next(mut self) -> Option<(NormalizedResponse, Self)> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Done) {
                Phase::Done if self.emitted => return None,
                Phase::Done => {
                    let error = ChatError::upstream(None, "turn ended without an assistant reply");
                    return Some(self.fail(&error));
                }
                Phase::Connect { round } => match self.orchestrator.provider.stream(&self.request).await {
                    Ok(chunks) => {
                        self.phase = Phase::Streaming {
                            chunks,
                            accumulator: AccumulatorState::new(),
                            round,
                        };
                    }
                    Err(e) => return Some(self.fail(&e)),
                },
                Phase::Streaming {
                    mut chunks,
                    accumulator,
                    round,
                } => {
                    let (accumulator, transition, chunk) = match chunks.chunks.next().await {
                        None => {
                            let (accumulator, transition) = accumulator.finish();
                            (accumulator, transition, None)
                        }
                        Some(Err(e)) => return Some(self.fail(&e)),
                        Some(Ok(chunk)) => {
                            // No choices: neither text nor call data
                            let Some(signal) = chunk.tool_call_signal() else {
                                self.phase = Phase::Streaming {
                                    chunks,
                                    accumulator,
                                    round,
                                };
                                continue;
                            };
                            let (accumulator, transition) = accumulator.ingest(signal);
                            (accumulator, transition, Some(chunk))
                        }
                    };

                    let emit = transition == Transition::Emit;

                    match transition {
                        Transition::CallsReady(calls) => {
                            drop(chunks);

                            if round >= MAX_FUNCTION_ROUNDS {
                                tracing::warn!(count = calls.len(), "function call limit reached, ending turn");
                                continue;
                            }

                            match self.orchestrator.execute(accumulator, &calls).await {
                                Ok(accumulator) if accumulator.synthesized_messages().is_empty() => {
                                    tracing::warn!(count = calls.len(), "no function produced a result, ending turn");
                                }
                                Ok(accumulator) => {
                                    self.request.messages.extend(accumulator.into_synthesized_messages());
                                    self.phase = Phase::Connect { round: round + 1 };
                                }
                                Err(e) => return Some(self.fail(&e)),
                            }
                        }
                        Transition::Emit | Transition::Buffer | Transition::Ignore => {
                            let Some(chunk) = chunk else {
                                continue;
                            };

                            let envelope = if emit {
                                format_chunk(&chunk, &self.history_metadata, chunks.upstream_request_id.as_deref())
                            } else {
                                None
                            };

                            self.phase = Phase::Streaming {
                                chunks,
                                accumulator,
                                round,
                            };

                            if let Some(envelope) = envelope {
                                self.emitted = true;
                                return Some((envelope, self));
                            }
                        }
                    }
                }
            }
        }
    }

    /// Apology envelope; the turn ends after it
    fn fail(mut self, error: &ChatError) -> (NormalizedResponse, Self) {
        tracing::error!(provider = %self.orchestrator.provider.name(), error = %error, "conversation turn failed");

        let envelope = format_error(
            error,
            self.orchestrator.provider.name(),
            ResponseObject::Chunk,
            &self.history_metadata,
        );
        self.emitted = true;

        (envelope, self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::APOLOGY_MESSAGE;
    use crate::types::{
        ChunkDelta, CompletionChunk, Content, FunctionCall, Message, ResponseMessage, ToolCall, ToolCallFragment,
    };

    enum Round {
        Chunks(Vec<Result<CompletionChunk, ChatError>>),
        Response(CompletionResponse),
        Fail(ChatError),
    }

    /// Provider replaying scripted rounds and recording every request
    #[derive(Default)]
    struct ScriptedProvider {
        rounds: Mutex<VecDeque<Round>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(rounds: impl IntoIterator<Item = Round>) -> Arc<Self> {
            Arc::new(Self {
                rounds: Mutex::new(rounds.into_iter().collect()),
                requests: Mutex::default(),
            })
        }

        fn next_round(&self, request: &ChatRequest) -> Round {
            self.requests.lock().unwrap().push(request.clone());
            self.rounds.lock().unwrap().pop_front().expect("unexpected upstream request")
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, ChatError> {
            match self.next_round(request) {
                Round::Response(response) => Ok(response),
                Round::Fail(e) => Err(e),
                Round::Chunks(_) => panic!("expected a streaming request"),
            }
        }

        async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, ChatError> {
            match self.next_round(request) {
                Round::Chunks(chunks) => Ok(ChunkStream {
                    chunks: Box::pin(futures_util::stream::iter(chunks)),
                    upstream_request_id: Some("req-1".to_owned()),
                }),
                Round::Fail(e) => Err(e),
                Round::Response(_) => panic!("expected a non-streaming request"),
            }
        }
    }

    /// Invoker answering from a fixed table and recording calls
    #[derive(Default)]
    struct TableInvoker {
        results: Vec<(&'static str, Result<&'static str, &'static str>)>,
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl FunctionInvoker for TableInvoker {
        async fn invoke(&self, name: &str, arguments: &str) -> Result<String, FunctionError> {
            self.calls.lock().unwrap().push((name.to_owned(), arguments.to_owned()));

            match self.results.iter().find(|(known, _)| *known == name) {
                Some((_, Ok(result))) => Ok((*result).to_owned()),
                Some((_, Err(message))) => Err(FunctionError::Failed {
                    name: name.to_owned(),
                    message: (*message).to_owned(),
                }),
                None => Err(FunctionError::Unknown(name.to_owned())),
            }
        }
    }

    fn text(content: &str) -> Result<CompletionChunk, ChatError> {
        Ok(CompletionChunk {
            id: "chatcmpl-1".to_owned(),
            model: "gpt-4o".to_owned(),
            created: 1,
            delta: Some(ChunkDelta {
                content: Some(content.to_owned()),
                ..ChunkDelta::default()
            }),
        })
    }

    fn calls(fragments: Vec<ToolCallFragment>) -> Result<CompletionChunk, ChatError> {
        Ok(CompletionChunk {
            id: "chatcmpl-1".to_owned(),
            model: "gpt-4o".to_owned(),
            created: 1,
            delta: Some(ChunkDelta {
                tool_calls: fragments,
                ..ChunkDelta::default()
            }),
        })
    }

    fn no_choices() -> Result<CompletionChunk, ChatError> {
        Ok(CompletionChunk {
            id: String::new(),
            model: String::new(),
            created: 0,
            delta: None,
        })
    }

    fn end_of_calls() -> Result<CompletionChunk, ChatError> {
        calls(Vec::new())
    }

    fn response(content: Option<&str>, tool_calls: Vec<ToolCall>) -> CompletionResponse {
        CompletionResponse {
            id: "r".to_owned(),
            model: "gpt-4o".to_owned(),
            created: 1,
            message: Some(ResponseMessage {
                content: content.map(str::to_owned),
                context: None,
                tool_calls,
            }),
            upstream_request_id: None,
        }
    }

    fn lookup_call() -> ToolCall {
        ToolCall {
            id: "c1".to_owned(),
            function: FunctionCall {
                name: "lookup".to_owned(),
                arguments: "{\"q\":1}".to_owned(),
            },
        }
    }

    fn turn(messages: Vec<Message>) -> Turn {
        Turn {
            request: ChatRequest::new(messages, "u1"),
            history_metadata: HistoryMetadata::new(),
        }
    }

    fn lookup_invoker() -> Arc<TableInvoker> {
        Arc::new(TableInvoker {
            results: vec![("lookup", Ok("42"))],
            ..TableInvoker::default()
        })
    }

    async fn collect(orchestrator: &Orchestrator, turn: Turn) -> Vec<NormalizedResponse> {
        orchestrator.stream(turn).collect().await
    }

    #[tokio::test]
    async fn text_stream_emits_one_chunk() {
        let provider = ScriptedProvider::new([Round::Chunks(vec![text("hello")])]);
        let orchestrator = Orchestrator::new(provider.clone(), None);

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].object, ResponseObject::Chunk);
        assert_eq!(envelopes[0].assistant_text(), "hello");
        assert_eq!(envelopes[0].upstream_request_id.as_deref(), Some("req-1"));
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn streamed_call_triggers_second_round_trip() {
        let provider = ScriptedProvider::new([
            Round::Chunks(vec![
                calls(vec![ToolCallFragment::start("c1", "lookup", "")]),
                calls(vec![ToolCallFragment::continuation("{\"q\":1}")]),
                end_of_calls(),
                text("ignored after completion"),
            ]),
            Round::Chunks(vec![text("the answer is 42")]),
        ]);
        let invoker = lookup_invoker();
        let orchestrator = Orchestrator::new(provider.clone(), Some(invoker.clone()));

        let envelopes = collect(&orchestrator, turn(vec![Message::user("look it up")])).await;

        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].assistant_text(), "the answer is 42");
        assert_eq!(
            *invoker.calls.lock().unwrap(),
            vec![("lookup".to_owned(), "{\"q\":1}".to_owned())]
        );

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let appended = &requests[1].messages[1..];
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[0].role, Role::Assistant);
        assert_eq!(
            appended[0].function_call,
            Some(FunctionCall {
                name: "lookup".to_owned(),
                arguments: "{\"q\":1}".to_owned(),
            })
        );
        assert_eq!(appended[1].role, Role::Function);
        assert_eq!(appended[1].content, Some(Content::Text("42".to_owned())));
    }

    #[tokio::test]
    async fn dangling_call_is_run_when_stream_ends() {
        let provider = ScriptedProvider::new([
            Round::Chunks(vec![calls(vec![ToolCallFragment::start("c1", "lookup", "{}")])]),
            Round::Chunks(vec![text("done")]),
        ]);
        let orchestrator = Orchestrator::new(provider.clone(), Some(lookup_invoker()));

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        assert_eq!(envelopes[0].assistant_text(), "done");
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn chunks_without_choices_are_skipped() {
        let provider = ScriptedProvider::new([Round::Chunks(vec![no_choices(), text("a"), no_choices(), text("b")])]);
        let orchestrator = Orchestrator::new(provider, None);

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        let text: Vec<_> = envelopes.iter().map(NormalizedResponse::assistant_text).collect();
        assert_eq!(text, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unknown_function_ends_turn_without_reconnecting() {
        let provider = ScriptedProvider::new([Round::Chunks(vec![
            calls(vec![ToolCallFragment::start("c1", "missing", "{}")]),
            end_of_calls(),
        ])]);
        let orchestrator = Orchestrator::new(provider.clone(), Some(lookup_invoker()));

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].assistant_text(), APOLOGY_MESSAGE);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn unknown_call_alongside_known_one_still_retries() {
        let provider = ScriptedProvider::new([
            Round::Chunks(vec![
                calls(vec![
                    ToolCallFragment::start("c1", "missing", "{}"),
                    ToolCallFragment::start("c2", "lookup", "{}"),
                ]),
                end_of_calls(),
            ]),
            Round::Chunks(vec![text("carried on")]),
        ]);
        let orchestrator = Orchestrator::new(provider.clone(), Some(lookup_invoker()));

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        assert_eq!(envelopes[0].assistant_text(), "carried on");
        // Only the known call's exchange is appended
        assert_eq!(provider.requests()[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn disabled_function_calling_ends_turn_with_one_envelope() {
        let provider = ScriptedProvider::new([Round::Chunks(vec![
            calls(vec![ToolCallFragment::start("c1", "lookup", "{}")]),
            end_of_calls(),
        ])]);
        let orchestrator = Orchestrator::new(provider.clone(), None);

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].object, ResponseObject::Chunk);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn empty_upstream_stream_still_closes_the_turn() {
        let provider = ScriptedProvider::new([Round::Chunks(vec![])]);
        let orchestrator = Orchestrator::new(provider.clone(), None);

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].object, ResponseObject::Chunk);
        assert_eq!(envelopes[0].assistant_text(), APOLOGY_MESSAGE);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn failed_function_aborts_with_apology() {
        let provider = ScriptedProvider::new([Round::Chunks(vec![
            calls(vec![ToolCallFragment::start("c1", "lookup", "{}")]),
            end_of_calls(),
        ])]);
        let invoker = Arc::new(TableInvoker {
            results: vec![("lookup", Err("500"))],
            ..TableInvoker::default()
        });
        let orchestrator = Orchestrator::new(provider.clone(), Some(invoker));

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].assistant_text(), APOLOGY_MESSAGE);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn mid_stream_failure_ends_with_apology() {
        let provider = ScriptedProvider::new([Round::Chunks(vec![
            text("partial"),
            Err(ChatError::upstream(None, "connection reset")),
            text("never seen"),
        ])]);
        let orchestrator = Orchestrator::new(provider, None);

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        let text: Vec<_> = envelopes.iter().map(NormalizedResponse::assistant_text).collect();
        assert_eq!(text, vec!["partial".to_owned(), APOLOGY_MESSAGE.to_owned()]);
        assert!(envelopes.iter().all(|e| e.object == ResponseObject::Chunk));
    }

    #[tokio::test]
    async fn connection_failure_is_one_apology_chunk() {
        let provider = ScriptedProvider::new([Round::Fail(ChatError::Timeout)]);
        let orchestrator = Orchestrator::new(provider, None);

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].assistant_text(), ChatError::Timeout.user_message());
    }

    #[tokio::test]
    async fn second_round_calls_are_not_executed() {
        let provider = ScriptedProvider::new([
            Round::Chunks(vec![calls(vec![ToolCallFragment::start("c1", "lookup", "{}")]), end_of_calls()]),
            Round::Chunks(vec![calls(vec![ToolCallFragment::start("c2", "lookup", "{}")]), end_of_calls()]),
        ]);
        let invoker = lookup_invoker();
        let orchestrator = Orchestrator::new(provider.clone(), Some(invoker.clone()));

        let envelopes = collect(&orchestrator, turn(vec![Message::user("hi")])).await;

        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].assistant_text(), APOLOGY_MESSAGE);
        assert_eq!(invoker.calls.lock().unwrap().len(), 1);
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn tool_messages_are_stripped() {
        let provider = ScriptedProvider::new([Round::Chunks(vec![text("ok")])]);
        let orchestrator = Orchestrator::new(provider.clone(), None);

        let _ = collect(
            &orchestrator,
            turn(vec![
                Message::user("first"),
                Message::text(Role::Tool, "{\"citations\": []}"),
                Message::text(Role::Assistant, "reply"),
                Message::user("second"),
            ]),
        )
        .await;

        let sent = &provider.requests()[0].messages;
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|m| m.role != Role::Tool));
    }

    #[tokio::test]
    async fn nothing_is_requested_until_polled() {
        let provider = ScriptedProvider::new([Round::Chunks(vec![text("a"), text("b")])]);
        let orchestrator = Orchestrator::new(provider.clone(), None);

        let mut stream = orchestrator.stream(turn(vec![Message::user("hi")]));
        assert!(provider.requests().is_empty());

        let first = stream.next().await.unwrap();
        assert_eq!(first.assistant_text(), "a");
        drop(stream);

        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn complete_runs_calls_then_retries_once() {
        let provider = ScriptedProvider::new([
            Round::Response(response(None, vec![lookup_call()])),
            Round::Response(response(Some("the answer is 42"), Vec::new())),
        ]);
        let orchestrator = Orchestrator::new(provider.clone(), Some(lookup_invoker()));

        let envelope = orchestrator.complete(turn(vec![Message::user("hi")])).await;

        assert_eq!(envelope.object, ResponseObject::Completion);
        assert_eq!(envelope.assistant_text(), "the answer is 42");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[1].messages[2].tool_call_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn complete_returns_retry_even_if_it_requests_calls() {
        let provider = ScriptedProvider::new([
            Round::Response(response(None, vec![lookup_call()])),
            Round::Response(response(Some("again"), vec![lookup_call()])),
        ]);
        let invoker = lookup_invoker();
        let orchestrator = Orchestrator::new(provider.clone(), Some(invoker.clone()));

        let envelope = orchestrator.complete(turn(vec![Message::user("hi")])).await;

        assert_eq!(envelope.assistant_text(), "again");
        assert_eq!(invoker.calls.lock().unwrap().len(), 1);
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn complete_skips_retry_when_only_unknown_functions_were_called() {
        let mut call = lookup_call();
        call.function.name = "missing".to_owned();
        let provider = ScriptedProvider::new([Round::Response(response(Some("first"), vec![call]))]);
        let orchestrator = Orchestrator::new(provider.clone(), Some(lookup_invoker()));

        let envelope = orchestrator.complete(turn(vec![Message::user("hi")])).await;

        assert_eq!(envelope.assistant_text(), "first");
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn complete_without_invoker_returns_first_response() {
        let provider = ScriptedProvider::new([Round::Response(response(None, vec![lookup_call()]))]);
        let orchestrator = Orchestrator::new(provider.clone(), None);

        let envelope = orchestrator.complete(turn(vec![Message::user("hi")])).await;

        assert_eq!(envelope.object, ResponseObject::Completion);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn complete_failure_is_apology() {
        let provider = ScriptedProvider::new([Round::Fail(ChatError::upstream(Some(500), "boom"))]);
        let orchestrator = Orchestrator::new(provider, None);

        let envelope = orchestrator.complete(turn(vec![Message::user("hi")])).await;

        assert_eq!(envelope.object, ResponseObject::Completion);
        assert_eq!(envelope.assistant_text(), APOLOGY_MESSAGE);
    }
}
