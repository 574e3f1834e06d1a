//! Chat backends
//!
//! Every backend answers a [`ChatRequest`] either in one piece
//! ([`ChatProvider::complete`]) or as a lazy stream of chunks
//! ([`ChatProvider::stream`]). The active backend is chosen once per process
//! by [`from_config`].

pub mod openai;
pub mod webhook;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use parley_config::{ChatConfig, ChatProviderKind};
use reqwest::Client;

use crate::error::ChatError;
use crate::functions::FunctionRegistry;
use crate::types::{ChatRequest, CompletionChunk, CompletionResponse};

/// Lazily-pulled chunks of one streamed round-trip
///
/// Dropping it releases the upstream connection.
pub struct ChunkStream {
    /// Chunks in arrival order
    pub chunks: Pin<Box<dyn Stream<Item = Result<CompletionChunk, ChatError>> + Send>>,
    /// Upstream request id (Azure `apim-request-id`)
    pub upstream_request_id: Option<String>,
}

/// A chat backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Name used for logging and error envelopes
    fn name(&self) -> &str;

    /// One round-trip returning the complete answer
    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, ChatError>;

    /// One round-trip returning the answer incrementally
    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, ChatError>;
}

/// Construct the configured provider
///
/// # Errors
///
/// Returns `ChatError::Configuration` if the selected provider's section is
/// missing or invalid.
pub fn from_config(
    config: &ChatConfig,
    client: Client,
    registry: Arc<FunctionRegistry>,
) -> Result<Arc<dyn ChatProvider>, ChatError> {
    let provider: Arc<dyn ChatProvider> = match config.provider {
        ChatProviderKind::Openai => {
            let openai = config
                .openai
                .as_ref()
                .ok_or_else(|| ChatError::Configuration("missing [chat.openai] section".to_owned()))?;

            Arc::new(openai::OpenAiProvider::new(openai, client, registry)?)
        }
        ChatProviderKind::Webhook => {
            let webhook = config
                .webhook
                .as_ref()
                .ok_or_else(|| ChatError::Configuration("missing [chat.webhook] section".to_owned()))?;

            Arc::new(webhook::WebhookProvider::new(
                webhook,
                client,
                crate::session::from_mode(webhook.sessions),
            ))
        }
    };

    tracing::info!(provider = %provider.name(), "chat provider ready");

    Ok(provider)
}
