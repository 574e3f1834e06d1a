//! Axum route handlers for the conversation and history endpoints

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router, routing};
use futures_util::StreamExt;
use parley_config::Config;
use parley_core::{HttpError, RequestContext};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::ChatError;
use crate::format::HistoryMetadata;
use crate::functions::{FunctionInvoker, FunctionRegistry, RemoteFunctionInvoker};
use crate::history::{ConversationStore, MemoryConversationStore, generate_title};
use crate::orchestrator::{EnvelopeStream, Orchestrator, Turn};
use crate::provider::webhook::RatingNotifier;
use crate::types::{ChatRequest, Message, Role};

/// Content type of streamed responses, one JSON envelope per line
pub const NDJSON_CONTENT_TYPE: &str = "application/json-lines";

/// Shared state for chat route handlers
#[derive(Clone)]
pub struct ChatState {
    inner: Arc<ChatStateInner>,
}

#[derive(Clone)]
struct ChatStateInner {
    orchestrator: Orchestrator,
    stream: bool,
    history: Option<Arc<dyn ConversationStore>>,
    page_size: usize,
    ui_title: String,
    rating_notifier: Option<RatingNotifier>,
}

impl ChatState {
    /// Build the provider, function registry, and history store from configuration
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Configuration` if the selected provider or function
    /// calling is misconfigured.
    pub async fn from_config(config: &Config) -> Result<Self, ChatError> {
        let client = Client::new();
        let functions = &config.chat.functions;

        let registry = if functions.enabled {
            FunctionRegistry::fetch(&client, functions).await
        } else {
            FunctionRegistry::default()
        };
        let registry = Arc::new(registry);

        let provider = crate::provider::from_config(&config.chat, client.clone(), Arc::clone(&registry))?;

        let rating_notifier = config
            .chat
            .webhook
            .as_ref()
            .map(|webhook| RatingNotifier::new(webhook, client.clone()));

        let invoker: Option<Arc<dyn FunctionInvoker>> = if functions.enabled {
            Some(Arc::new(RemoteFunctionInvoker::new(client, functions, registry)?))
        } else {
            None
        };

        let history: Option<Arc<dyn ConversationStore>> = config
            .history
            .enabled
            .then(|| Arc::new(MemoryConversationStore::default()) as Arc<dyn ConversationStore>);

        Ok(Self::new(Orchestrator::new(provider, invoker), config.chat.stream)
            .with_history(history, config.history.page_size)
            .with_ui_title(config.ui.title.clone())
            .with_rating_notifier(rating_notifier))
    }

    /// State around an existing orchestrator, history disabled
    pub fn new(orchestrator: Orchestrator, stream: bool) -> Self {
        Self {
            inner: Arc::new(ChatStateInner {
                orchestrator,
                stream,
                history: None,
                page_size: parley_config::HistoryConfig::default().page_size,
                ui_title: parley_config::UiConfig::default().title,
                rating_notifier: None,
            }),
        }
    }

    /// Attach a conversation store
    #[must_use]
    pub fn with_history(mut self, history: Option<Arc<dyn ConversationStore>>, page_size: usize) -> Self {
        let inner = Arc::make_mut(&mut self.inner);
        inner.history = history;
        inner.page_size = page_size;
        self
    }

    /// Set the title reported to the frontend
    #[must_use]
    pub fn with_ui_title(mut self, ui_title: String) -> Self {
        Arc::make_mut(&mut self.inner).ui_title = ui_title;
        self
    }

    /// Report message ratings to the workflow webhook
    #[must_use]
    pub fn with_rating_notifier(mut self, rating_notifier: Option<RatingNotifier>) -> Self {
        Arc::make_mut(&mut self.inner).rating_notifier = rating_notifier;
        self
    }

    fn history(&self) -> Result<&dyn ConversationStore, ChatError> {
        self.inner
            .history
            .as_deref()
            .ok_or_else(|| ChatError::NotFound("conversation history is not configured".to_owned()))
    }

    /// Run a turn, streaming or not per configuration
    async fn respond(&self, turn: Turn) -> Response {
        if self.inner.stream {
            ndjson_response(self.inner.orchestrator.stream(turn))
        } else {
            Json(self.inner.orchestrator.complete(turn).await).into_response()
        }
    }
}

/// Build the chat router with all endpoints
pub fn chat_router(state: ChatState) -> Router {
    Router::new()
        .route("/conversation", routing::post(conversation))
        .route("/frontend_settings", routing::get(frontend_settings))
        .route("/history/generate", routing::post(history_generate))
        .route("/history/update", routing::post(history_update))
        .route("/history/read", routing::post(history_read))
        .route("/history/list", routing::get(history_list))
        .route("/history/rename", routing::post(history_rename))
        .route("/history/delete", routing::delete(history_delete))
        .route("/history/clear", routing::post(history_clear))
        .route("/history/delete_all", routing::delete(history_delete_all))
        .route("/history/message_feedback", routing::post(history_message_feedback))
        .route("/history/message_rating", routing::post(history_message_rating))
        .route("/history/ensure", routing::get(history_ensure))
        .with_state(state)
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_) | Self::Configuration(_)) {
            tracing::error!(error_type = self.error_type(), error = %self, "request failed");
        }

        (self.status_code(), Json(self.error_body())).into_response()
    }
}

/// Body of `/conversation` and `/history/generate`
#[derive(Debug, Deserialize)]
struct ConversationBody {
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    history_metadata: HistoryMetadata,
    #[serde(default)]
    conversation_id: Option<String>,
}

impl ConversationBody {
    /// Conversation key: history metadata first, then the body field
    fn conversation_id(&self) -> Option<String> {
        self.history_metadata
            .get("conversation_id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| self.conversation_id.clone())
            .filter(|id| !id.is_empty())
    }

    fn into_turn(self, context: &RequestContext) -> Turn {
        let conversation_id = self.conversation_id();

        Turn {
            request: ChatRequest {
                messages: self.messages,
                conversation_id,
                user_id: context.user_id().to_owned(),
                client_ip: context.client_ip().map(str::to_owned),
            },
            history_metadata: self.history_metadata,
        }
    }
}

/// Body of history calls addressing one conversation
#[derive(Debug, Deserialize)]
struct ConversationRef {
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    title: Option<String>,
}

impl ConversationRef {
    fn require_id(&self) -> Result<&str, ChatError> {
        self.conversation_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ChatError::Validation("conversation_id is required".to_owned()))
    }
}

/// Body of history calls addressing one message
#[derive(Debug, Deserialize)]
struct MessageRef {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    message_feedback: Option<String>,
    #[serde(default)]
    msgrating: Option<Value>,
}

impl MessageRef {
    fn require_id(&self) -> Result<&str, ChatError> {
        self.message_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ChatError::Validation("message_id is required".to_owned()))
    }
}

fn message_not_found(message_id: &str) -> ChatError {
    ChatError::NotFound(format!(
        "Unable to update message {message_id}. It either does not exist or the user does not have access to it."
    ))
}

/// Unwrap a JSON body; a missing JSON content type is 415, anything else 400
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Err((
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Json(json!({"error": "request must be json"})),
        )
            .into_response()),
        Err(rejection) => Err(ChatError::Validation(rejection.body_text()).into_response()),
    }
}

/// Stream envelopes as newline-delimited JSON
fn ndjson_response(envelopes: EnvelopeStream) -> Response {
    let lines = envelopes.map(|envelope| {
        serde_json::to_string(&envelope).map(|mut line| {
            line.push('\n');
            line
        })
    });

    ([(CONTENT_TYPE, NDJSON_CONTENT_TYPE)], Body::from_stream(lines)).into_response()
}

fn message_id(message: &Message) -> String {
    message
        .id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Handle `POST /conversation`
async fn conversation(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<ConversationBody>, JsonRejection>,
) -> Response {
    let body = match json_body(payload) {
        Ok(body) => body,
        Err(response) => return response,
    };

    if body.messages.is_empty() {
        return ChatError::Validation("messages is required".to_owned()).into_response();
    }

    state.respond(body.into_turn(&context)).await
}

/// Handle `GET /frontend_settings`
async fn frontend_settings(State(state): State<ChatState>) -> Json<Value> {
    Json(json!({
        "auth_enabled": false,
        "feedback_enabled": state.inner.history.is_some(),
        "history_enabled": state.inner.history.is_some(),
        "ui": {"title": state.inner.ui_title},
    }))
}

/// Handle `POST /history/generate`
async fn history_generate(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<ConversationBody>, JsonRejection>,
) -> Result<Response, ChatError> {
    let mut body = match json_body(payload) {
        Ok(body) => body,
        Err(response) => return Ok(response),
    };

    let store = state.history()?;
    let user_id = context.user_id();

    let Some(last) = body.messages.last().filter(|m| m.role == Role::User) else {
        return Err(ChatError::Validation("the last message must be from the user".to_owned()));
    };

    let conversation = match body.conversation_id() {
        Some(id) => store
            .get_conversation(user_id, &id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("conversation {id} was not found")))?,
        None => store.create_conversation(user_id, &generate_title(&body.messages)).await?,
    };

    store
        .create_message(&message_id(last), &conversation.id, user_id, last)
        .await?;

    body.history_metadata
        .insert("conversation_id".to_owned(), json!(conversation.id));
    body.history_metadata.insert("title".to_owned(), json!(conversation.title));
    body.history_metadata
        .insert("date".to_owned(), json!(conversation.created_at.to_string()));

    Ok(state.respond(body.into_turn(&context)).await)
}

/// Handle `POST /history/update`
async fn history_update(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
    Json(body): Json<ConversationRef>,
) -> Result<Json<Value>, ChatError> {
    let store = state.history()?;
    let user_id = context.user_id();
    let conversation_id = body.require_id()?;

    let Some((last, earlier)) = body.messages.split_last().filter(|(last, _)| last.role == Role::Assistant) else {
        return Err(ChatError::Validation("no assistant message to store".to_owned()));
    };

    if let Some(tool) = earlier.last().filter(|m| m.role == Role::Tool) {
        store
            .create_message(&message_id(tool), conversation_id, user_id, tool)
            .await?;
    }

    store
        .create_message(&message_id(last), conversation_id, user_id, last)
        .await?;

    Ok(Json(json!({"success": true})))
}

/// Handle `POST /history/read`
async fn history_read(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
    Json(body): Json<ConversationRef>,
) -> Result<Json<Value>, ChatError> {
    let store = state.history()?;
    let user_id = context.user_id();
    let conversation_id = body.require_id()?;

    if store.get_conversation(user_id, conversation_id).await?.is_none() {
        return Err(ChatError::NotFound(format!("conversation {conversation_id} was not found")));
    }

    let messages = store.get_messages(user_id, conversation_id).await?;

    Ok(Json(json!({
        "conversation_id": conversation_id,
        "messages": messages,
    })))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    offset: usize,
}

/// Handle `GET /history/list`
async fn history_list(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ChatError> {
    let store = state.history()?;

    let conversations = store
        .list_conversations(context.user_id(), query.offset, state.inner.page_size)
        .await?;

    Ok(Json(json!(conversations)))
}

/// Handle `POST /history/rename`
async fn history_rename(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
    Json(body): Json<ConversationRef>,
) -> Result<Json<Value>, ChatError> {
    let store = state.history()?;
    let conversation_id = body.require_id()?;

    let Some(title) = body.title.as_deref().filter(|t| !t.trim().is_empty()) else {
        return Err(ChatError::Validation("title is required".to_owned()));
    };

    let conversation = store
        .rename_conversation(context.user_id(), conversation_id, title)
        .await?;

    Ok(Json(json!(conversation)))
}

/// Handle `DELETE /history/delete`
async fn history_delete(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
    Json(body): Json<ConversationRef>,
) -> Result<Json<Value>, ChatError> {
    let store = state.history()?;
    let user_id = context.user_id();
    let conversation_id = body.require_id()?;

    store.delete_messages(user_id, conversation_id).await?;
    if !store.delete_conversation(user_id, conversation_id).await? {
        return Err(ChatError::NotFound(format!("conversation {conversation_id} was not found")));
    }

    Ok(Json(json!({
        "message": "Successfully deleted conversation and messages",
        "conversation_id": conversation_id,
    })))
}

/// Handle `POST /history/clear`
async fn history_clear(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
    Json(body): Json<ConversationRef>,
) -> Result<Json<Value>, ChatError> {
    let store = state.history()?;
    let conversation_id = body.require_id()?;

    store.delete_messages(context.user_id(), conversation_id).await?;

    Ok(Json(json!({
        "message": "Successfully deleted messages in conversation",
        "conversation_id": conversation_id,
    })))
}

/// Handle `DELETE /history/delete_all`
async fn history_delete_all(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
) -> Result<Json<Value>, ChatError> {
    let store = state.history()?;
    let user_id = context.user_id();

    if store.delete_all_conversations(user_id).await? == 0 {
        return Err(ChatError::NotFound(format!("No conversations for {user_id} were found")));
    }

    Ok(Json(json!({
        "message": format!("Successfully deleted conversation and messages for user {user_id}"),
    })))
}

/// Handle `POST /history/message_feedback`
async fn history_message_feedback(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
    Json(body): Json<MessageRef>,
) -> Result<Json<Value>, ChatError> {
    let store = state.history()?;
    let message_id = body.require_id()?;

    let Some(feedback) = body.message_feedback.as_deref().filter(|f| !f.is_empty()) else {
        return Err(ChatError::Validation("message_feedback is required".to_owned()));
    };

    store
        .update_message_feedback(context.user_id(), message_id, feedback)
        .await?
        .ok_or_else(|| message_not_found(message_id))?;

    Ok(Json(json!({
        "message": format!("Successfully updated message with feedback {feedback}"),
        "message_id": message_id,
    })))
}

/// Handle `POST /history/message_rating`
///
/// The rating is reported to the workflow webhook when one is configured; a
/// failed report is logged and does not fail the request.
async fn history_message_rating(
    State(state): State<ChatState>,
    Extension(context): Extension<RequestContext>,
    Json(body): Json<MessageRef>,
) -> Result<Json<Value>, ChatError> {
    let store = state.history()?;
    let user_id = context.user_id();
    let message_id = body.require_id()?;
    let rating = body.msgrating.clone().unwrap_or_default();

    let updated = store
        .update_message_rating(user_id, message_id, rating.clone())
        .await?
        .ok_or_else(|| message_not_found(message_id))?;

    if let Some(notifier) = &state.inner.rating_notifier
        && let Err(e) = notifier.notify(user_id, &updated).await
    {
        tracing::warn!(message = %message_id, error = %e, "failed to report rating to webhook");
    }

    Ok(Json(json!({
        "message": "Successfully updated message rating",
        "message_id": message_id,
        "msgrating": rating,
    })))
}

/// Handle `GET /history/ensure`
async fn history_ensure(State(state): State<ChatState>) -> Result<Json<Value>, ChatError> {
    state.history()?.ensure().await?;

    Ok(Json(json!({"message": "conversation history is configured and working"})))
}
