//! OpenAI-compatible provider (`OpenAI` and Azure `OpenAI` endpoint flavors)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::{StreamExt, future};
use parley_config::{OpenAiConfig, OpenAiFlavor};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{ChatProvider, ChunkStream};
use crate::convert::openai::outgoing_messages;
use crate::error::ChatError;
use crate::functions::FunctionRegistry;
use crate::protocol::openai::{OpenAiRequest, OpenAiResponse, OpenAiStreamChunk, UserSecurityContext};
use crate::types::{ChatRequest, CompletionChunk, CompletionResponse};

/// Response header carrying the Azure request id
const REQUEST_ID_HEADER: &str = "apim-request-id";

/// OpenAI-compatible chat completions provider
pub struct OpenAiProvider {
    name: &'static str,
    client: Client,
    flavor: OpenAiFlavor,
    completions_url: Url,
    api_key: Option<SecretString>,
    model: String,
    system_message: Option<String>,
    temperature: Option<f64>,
    top_p: Option<f64>,
    max_tokens: Option<u32>,
    stop: Vec<String>,
    timeout: Duration,
    user_security_context: bool,
    application_name: String,
    data_source: Option<serde_json::Value>,
    registry: Arc<FunctionRegistry>,
}

impl OpenAiProvider {
    /// Create from the `[chat.openai]` section
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Configuration` if the endpoint URL cannot be built.
    pub fn new(config: &OpenAiConfig, client: Client, registry: Arc<FunctionRegistry>) -> Result<Self, ChatError> {
        let completions_url = completions_url(config)?;

        let name = match config.flavor {
            OpenAiFlavor::Openai => "openai",
            OpenAiFlavor::Azure => "azure-openai",
        };

        Ok(Self {
            name,
            client,
            flavor: config.flavor,
            completions_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            // A data source carries its own role information
            system_message: config
                .data_source
                .is_none()
                .then(|| config.system_message.clone()),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            stop: config.stop.clone(),
            timeout: config.timeout,
            user_security_context: config.user_security_context,
            application_name: config.application_name.clone(),
            data_source: config.data_source.clone(),
            registry,
        })
    }

    /// Build the wire request for one round-trip
    fn build_request(&self, request: &ChatRequest, stream: bool) -> OpenAiRequest {
        let tools =
            (!self.registry.is_empty() && request.ends_with_user()).then(|| self.registry.tools().to_vec());

        let user_security_context = self.user_security_context.then(|| UserSecurityContext {
            application_name: self.application_name.clone(),
            end_user_id: request.user_id.clone(),
            source_ip: request.client_ip.clone(),
        });

        OpenAiRequest {
            model: self.model.clone(),
            messages: outgoing_messages(&request.messages, self.system_message.as_deref()),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            stop: (!self.stop.is_empty()).then(|| self.stop.clone()),
            stream,
            tools,
            data_sources: self.data_source.clone().map(|source| vec![source]),
            user_security_context,
        }
    }

    /// Send the request and check the status, bounded by the configured timeout
    async fn send(&self, wire_request: &OpenAiRequest) -> Result<Response, ChatError> {
        if tracing::enabled!(tracing::Level::DEBUG)
            && let Ok(body) = serde_json::to_value(wire_request)
        {
            tracing::debug!(provider = %self.name, body = %crate::redact::redact(&body), "sending chat request");
        }

        let mut builder = self.client.post(self.completions_url.clone()).json(wire_request);

        if let Some(key) = &self.api_key {
            builder = match self.flavor {
                OpenAiFlavor::Openai => builder.bearer_auth(key.expose_secret()),
                OpenAiFlavor::Azure => builder.header("api-key", key.expose_secret()),
            };
        }

        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| {
                tracing::warn!(provider = %self.name, timeout = ?self.timeout, "upstream request timed out");
                ChatError::Timeout
            })?
            .map_err(|e| {
                tracing::error!(provider = %self.name, error = %e, "upstream request failed");
                ChatError::from_transport(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(provider = %self.name, status = %status, "upstream returned error");
            return Err(ChatError::upstream(
                Some(status.as_u16()),
                format!("provider returned {status}: {body}"),
            ));
        }

        Ok(response)
    }

    async fn complete_unbounded(&self, request: &ChatRequest) -> Result<CompletionResponse, ChatError> {
        let response = self.send(&self.build_request(request, false)).await?;
        let upstream_request_id = request_id(&response);

        let wire_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| ChatError::upstream(None, format!("failed to parse response: {e}")))?;

        let mut response = CompletionResponse::from(wire_response);
        response.upstream_request_id = upstream_request_id;

        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, ChatError> {
        tokio::time::timeout(self.timeout, self.complete_unbounded(request))
            .await
            .map_err(|_| ChatError::Timeout)?
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, ChatError> {
        let response = self.send(&self.build_request(request, true)).await?;
        let upstream_request_id = request_id(&response);

        let chunks = response
            .bytes_stream()
            .eventsource()
            .take_while(|event| future::ready(!matches!(event, Ok(event) if event.data.trim() == "[DONE]")))
            .filter_map(|event| {
                future::ready(match event {
                    Ok(event) => match serde_json::from_str::<OpenAiStreamChunk>(event.data.trim()) {
                        Ok(chunk) => Some(Ok(CompletionChunk::from(chunk))),
                        Err(e) => {
                            tracing::debug!(error = %e, data = %event.data, "skipping unparseable SSE chunk");
                            None
                        }
                    },
                    Err(e) => Some(Err(ChatError::upstream(None, format!("stream interrupted: {e}")))),
                })
            });

        Ok(ChunkStream {
            chunks: Box::pin(chunks),
            upstream_request_id,
        })
    }
}

fn completions_url(config: &OpenAiConfig) -> Result<Url, ChatError> {
    let base = config.base_url.as_str().trim_end_matches('/');

    let raw = match config.flavor {
        OpenAiFlavor::Openai => format!("{base}/chat/completions"),
        OpenAiFlavor::Azure => {
            let version = config
                .api_version
                .as_deref()
                .ok_or_else(|| ChatError::Configuration("api_version is required for Azure".to_owned()))?;
            format!(
                "{base}/openai/deployments/{}/chat/completions?api-version={version}",
                config.model
            )
        }
    };

    Url::parse(&raw).map_err(|e| ChatError::Configuration(format!("invalid completions URL '{raw}': {e}")))
}

fn request_id(response: &Response) -> Option<String> {
    response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}
