//! Session identifiers for providers that keep server-side memory

use async_trait::async_trait;
use dashmap::DashMap;
use parley_config::SessionMode;

/// Assigns stable session identifiers to conversations
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Session identifier for `(user_id, conversation_id)`
    ///
    /// Without a conversation id a fresh identifier is returned on every call.
    async fn get_or_create_session(&self, user_id: &str, conversation_id: Option<&str>) -> String;
}

/// Build the store selected by configuration
pub fn from_mode(mode: SessionMode) -> Box<dyn SessionStore> {
    match mode {
        SessionMode::Memory => Box::new(MemorySessionStore::default()),
        SessionMode::Conversation => Box::new(ConversationSessionStore),
    }
}

fn fresh_session() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Mints a random identifier per user and conversation, kept in process memory
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, String>,
}

impl MemorySessionStore {
    /// Number of remembered sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session has been minted yet
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_or_create_session(&self, user_id: &str, conversation_id: Option<&str>) -> String {
        let Some(conversation_id) = conversation_id else {
            return fresh_session();
        };

        self.sessions
            .entry(format!("{user_id}:{conversation_id}"))
            .or_insert_with(|| {
                tracing::debug!(user = %user_id, conversation = %conversation_id, "minted new session");
                fresh_session()
            })
            .clone()
    }
}

/// Uses the conversation identifier itself as the session identifier
#[derive(Debug, Default, Clone, Copy)]
pub struct ConversationSessionStore;

#[async_trait]
impl SessionStore for ConversationSessionStore {
    async fn get_or_create_session(&self, _user_id: &str, conversation_id: Option<&str>) -> String {
        conversation_id.map_or_else(fresh_session, str::to_owned)
    }
}
