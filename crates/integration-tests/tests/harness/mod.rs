#![allow(dead_code)]

pub mod config;
pub mod mock_functions;
pub mod mock_llm;
pub mod mock_webhook;
pub mod server;

use std::net::SocketAddr;

use axum::Router;
use tokio_util::sync::CancellationToken;

/// Serve `app` on an ephemeral local port until the token is cancelled
pub async fn spawn(app: Router) -> anyhow::Result<(SocketAddr, CancellationToken)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_clone.cancelled().await;
            })
            .await
            .ok();
    });

    Ok((addr, shutdown))
}

/// Parse a newline-delimited JSON body
pub fn parse_ndjson(text: &str) -> Vec<serde_json::Value> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("each line is a JSON object"))
        .collect()
}

/// Concatenated first-message content of every envelope
pub fn streamed_text(envelopes: &[serde_json::Value]) -> String {
    envelopes
        .iter()
        .filter_map(|e| e["choices"][0]["messages"][0]["content"].as_str())
        .collect()
}
