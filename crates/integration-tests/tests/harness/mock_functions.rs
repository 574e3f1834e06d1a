//! Mock remote function host publishing a single `get_weather` tool

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Result returned for every `get_weather` call
pub const WEATHER: &str = "Sunny, 21C";

pub struct MockFunctions {
    addr: SocketAddr,
    shutdown: CancellationToken,
    invocations: Arc<Mutex<Vec<Value>>>,
}

#[derive(Deserialize)]
struct KeyQuery {
    code: Option<String>,
}

impl MockFunctions {
    pub async fn start() -> anyhow::Result<Self> {
        let invocations = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/api/tools", routing::get(list_tools))
            .route("/api/tool", routing::post(invoke_tool))
            .with_state(Arc::clone(&invocations));

        let (addr, shutdown) = super::spawn(app).await?;

        Ok(Self {
            addr,
            shutdown,
            invocations,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Recorded invocation bodies
    pub fn invocations(&self) -> Vec<Value> {
        self.invocations.lock().expect("lock").clone()
    }
}

impl Drop for MockFunctions {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn list_tools(Query(query): Query<KeyQuery>) -> Response {
    if query.code.as_deref() != Some("tools-key") {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(json!([{
        "type": "function",
        "function": {
            "name": "get_weather",
            "description": "Current weather for a city",
            "parameters": {
                "type": "object",
                "properties": {"location": {"type": "string"}},
                "required": ["location"]
            }
        }
    }]))
    .into_response()
}

async fn invoke_tool(
    State(invocations): State<Arc<Mutex<Vec<Value>>>>,
    Query(query): Query<KeyQuery>,
    Json(body): Json<Value>,
) -> Response {
    if query.code.as_deref() != Some("tool-key") {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    invocations.lock().expect("lock").push(body);
    WEATHER.into_response()
}
