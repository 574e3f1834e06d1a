//! Workflow webhook provider
//!
//! The webhook answers in one piece; streaming wraps that answer in a single chunk.
//! Message ratings are reported to the same webhook by [`RatingNotifier`].

use std::time::Duration;

use async_trait::async_trait;
use parley_config::WebhookConfig;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

use super::{ChatProvider, ChunkStream};
use crate::error::ChatError;
use crate::format::unix_now;
use crate::history::StoredMessage;
use crate::protocol::webhook::{
    RATING_SOURCE, RatedMessage, RatingMetadata, RatingNotification, WebhookRequest, extract_output,
};
use crate::session::SessionStore;
use crate::types::{ChatRequest, ChunkDelta, CompletionChunk, CompletionResponse, Message, ResponseMessage};

/// Model name reported in envelopes
const MODEL_NAME: &str = "n8n";

/// Authenticated webhook target shared by the provider and the rating notifier
#[derive(Clone)]
struct Endpoint {
    client: Client,
    url: Url,
    bearer_token: SecretString,
    timeout: Duration,
}

impl Endpoint {
    fn new(config: &WebhookConfig, client: Client) -> Self {
        Self {
            client,
            url: config.url.clone(),
            bearer_token: config.bearer_token.clone(),
            timeout: config.timeout,
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<Response, ChatError> {
        self.client
            .post(self.url.clone())
            .bearer_auth(self.bearer_token.expose_secret())
            .header(http::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(provider = MODEL_NAME, error = %e, "webhook request failed");
                ChatError::from_transport(&e)
            })
    }
}

/// Provider posting the last user message to a workflow webhook
pub struct WebhookProvider {
    endpoint: Endpoint,
    sessions: Box<dyn SessionStore>,
}

impl WebhookProvider {
    /// Create from the `[chat.webhook]` section
    pub fn new(config: &WebhookConfig, client: Client, sessions: Box<dyn SessionStore>) -> Self {
        Self {
            endpoint: Endpoint::new(config, client),
            sessions,
        }
    }

    /// Run the webhook and extract the reply text
    async fn call(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let last_user = request.last_user_message();

        let Some(chat_input) = last_user.and_then(Message::text_content).filter(|text| !text.is_empty()) else {
            tracing::warn!(provider = MODEL_NAME, "no user message to forward");
            return Err(ChatError::upstream(None, "conversation has no user message"));
        };

        let conversation = request
            .conversation_id
            .as_deref()
            .or_else(|| last_user.and_then(|message| message.id.as_deref()));

        let session_id = self.sessions.get_or_create_session(&request.user_id, conversation).await;

        tracing::debug!(provider = MODEL_NAME, session = %session_id, "calling webhook");

        let response = self
            .endpoint
            .post(&WebhookRequest {
                chat_input: chat_input.to_owned(),
                session_id,
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(provider = MODEL_NAME, status = %status, "webhook returned error");
            return Err(ChatError::upstream(Some(status.as_u16()), format!("webhook returned {status}")));
        }

        let body = response.text().await.map_err(|e| ChatError::from_transport(&e))?;
        let payload = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));

        let text = extract_output(&payload);
        if text.is_empty() {
            tracing::warn!(provider = MODEL_NAME, "webhook returned no assistant text");
            return Err(ChatError::upstream(Some(status.as_u16()), "webhook returned no assistant text"));
        }

        Ok(text)
    }
}

#[async_trait]
impl ChatProvider for WebhookProvider {
    fn name(&self) -> &str {
        MODEL_NAME
    }

    async fn complete(&self, request: &ChatRequest) -> Result<CompletionResponse, ChatError> {
        let text = self.call(request).await?;

        Ok(CompletionResponse {
            id: uuid::Uuid::new_v4().to_string(),
            model: MODEL_NAME.to_owned(),
            created: unix_now(),
            message: Some(ResponseMessage {
                content: Some(text),
                ..ResponseMessage::default()
            }),
            upstream_request_id: None,
        })
    }

    async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, ChatError> {
        let text = self.call(request).await?;

        let chunk = CompletionChunk {
            id: uuid::Uuid::new_v4().to_string(),
            model: MODEL_NAME.to_owned(),
            created: unix_now(),
            delta: Some(ChunkDelta {
                content: Some(text),
                ..ChunkDelta::default()
            }),
        };

        Ok(ChunkStream {
            chunks: Box::pin(futures_util::stream::iter([Ok(chunk)])),
            upstream_request_id: None,
        })
    }
}

/// Reports message ratings to the workflow webhook
#[derive(Clone)]
pub struct RatingNotifier {
    endpoint: Endpoint,
}

impl RatingNotifier {
    /// Create from the `[chat.webhook]` section
    pub fn new(config: &WebhookConfig, client: Client) -> Self {
        Self {
            endpoint: Endpoint::new(config, client),
        }
    }

    /// Post the rating of a stored message
    pub async fn notify(&self, user_id: &str, message: &StoredMessage) -> Result<(), ChatError> {
        let notification = RatingNotification {
            conversation_id: message.conversation_id.clone(),
            user_id: user_id.to_owned(),
            session_id: message.id.clone(),
            message: RatedMessage {
                role: message.role,
                content: message.content.clone(),
            },
            metadata: RatingMetadata {
                timestamp: message.updated_at.unwrap_or_else(jiff::Timestamp::now),
                source: RATING_SOURCE,
                msgrating: message.msgrating.clone().unwrap_or_default(),
                message_id: message.id.clone(),
            },
        };

        let status = self.endpoint.post(&notification).await?.status();
        if !status.is_success() {
            return Err(ChatError::upstream(Some(status.as_u16()), format!("webhook returned {status}")));
        }

        tracing::debug!(message = %message.id, "rating reported to webhook");

        Ok(())
    }
}
