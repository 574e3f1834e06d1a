//! Mock workflow webhook answering `{"output": ...}`

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

pub struct MockWebhook {
    addr: SocketAddr,
    shutdown: CancellationToken,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockWebhook {
    pub async fn start() -> anyhow::Result<Self> {
        let requests = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/webhook/chat", routing::post(handle))
            .with_state(Arc::clone(&requests));

        let (addr, shutdown) = super::spawn(app).await?;

        Ok(Self {
            addr,
            shutdown,
            requests,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}/webhook/chat", self.addr)
    }

    /// Recorded request bodies
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("lock").clone()
    }
}

impl Drop for MockWebhook {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle(State(requests): State<Arc<Mutex<Vec<Value>>>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer hook-token");

    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let input = body["chatInput"].as_str().unwrap_or_default().to_owned();
    requests.lock().expect("lock").push(body);

    Json(json!([{"output": format!("workflow says: {input}")}])).into_response()
}
