//! Mock OpenAI-compatible chat completions backend
//!
//! Streams a function call when tools are offered on a user turn, and text
//! otherwise. Every request body is recorded for assertions.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Default assistant answer
pub const ANSWER: &str = "It is sunny in Paris today.";

pub struct MockLlm {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockLlmState>,
}

struct MockLlmState {
    requests: Mutex<Vec<Value>>,
    /// Requests to fail with 500 before succeeding
    fail_count: AtomicU32,
}

impl MockLlm {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(0).await
    }

    /// Fail the first `n` requests with 500
    pub async fn start_failing(n: u32) -> anyhow::Result<Self> {
        Self::start_inner(n).await
    }

    async fn start_inner(fail_count: u32) -> anyhow::Result<Self> {
        let state = Arc::new(MockLlmState {
            requests: Mutex::new(Vec::new()),
            fail_count: AtomicU32::new(fail_count),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let (addr, shutdown) = super::spawn(app).await?;

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL including `/v1`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Recorded request bodies in arrival order
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().expect("lock").clone()
    }
}

impl Drop for MockLlm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_chat_completions(State(state): State<Arc<MockLlmState>>, Json(body): Json<Value>) -> Response {
    state.requests.lock().expect("lock").push(body.clone());

    if state
        .fail_count
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
        .is_ok()
    {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"message": "mock failure", "type": "server_error"}})),
        )
            .into_response();
    }

    let offers_tools = body["tools"].as_array().is_some_and(|tools| !tools.is_empty());
    let user_turn = body["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .is_some_and(|last| last["role"] == "user");
    let call_function = offers_tools && user_turn;

    if body["stream"].as_bool().unwrap_or(false) {
        let events = if call_function { tool_call_events() } else { text_events() };
        return sse(&events);
    }

    let message = if call_function {
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "get_weather", "arguments": "{\"location\":\"Paris\"}"}
            }]
        })
    } else {
        json!({"role": "assistant", "content": ANSWER})
    };

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": body["model"],
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
    }))
    .into_response()
}

fn chunk(delta: Value, finish_reason: Option<&str>) -> Value {
    json!({
        "id": "chatcmpl-mock-stream",
        "object": "chat.completion.chunk",
        "created": 1_700_000_000,
        "model": "mock-model",
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
    })
}

fn text_events() -> Vec<Value> {
    let (head, tail) = ANSWER.split_at(ANSWER.len() / 2);

    vec![
        chunk(json!({"role": "assistant", "content": ""}), None),
        chunk(json!({"content": head}), None),
        chunk(json!({"content": tail}), None),
        chunk(json!({}), Some("stop")),
    ]
}

fn tool_call_events() -> Vec<Value> {
    let fragment = |value: Value| chunk(json!({"tool_calls": [value]}), None);

    vec![
        fragment(json!({
            "index": 0,
            "id": "call_1",
            "type": "function",
            "function": {"name": "get_weather", "arguments": ""}
        })),
        fragment(json!({"index": 0, "function": {"arguments": "{\"location\":"}})),
        fragment(json!({"index": 0, "function": {"arguments": "\"Paris\"}"}})),
        chunk(json!({}), Some("tool_calls")),
    ]
}

fn sse(events: &[Value]) -> Response {
    let mut body: String = events.iter().map(|event| format!("data: {event}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");

    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}
