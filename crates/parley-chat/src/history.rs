//! Conversation history persistence
//!
//! The store is a collaborator reached through [`ConversationStore`]; the
//! in-process [`MemoryConversationStore`] backs it unless another
//! implementation is injected.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use serde::Serialize;
use serde_json::Value;

use crate::error::ChatError;
use crate::types::{Content, Message, Role};

/// Title used when no user text is available
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Words of the user's message kept in a generated title
const TITLE_WORDS: usize = 4;

/// Stored conversation header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation identifier
    pub id: String,
    /// Owner
    pub user_id: String,
    /// Display title
    pub title: String,
    /// Creation time
    pub created_at: Timestamp,
    /// Last change to the conversation or its messages
    pub updated_at: Timestamp,
    #[serde(skip)]
    sequence: u64,
}

/// Stored conversation message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredMessage {
    /// Message identifier
    pub id: String,
    /// Conversation the message belongs to
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    /// Author role
    pub role: Role,
    /// Message content
    pub content: Option<Content>,
    /// Creation time
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
    /// Last feedback or rating change
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// User feedback on the message
    pub feedback: Option<String>,
    /// User rating of the message, stored as sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msgrating: Option<Value>,
}

/// Persistence operations needed by the history endpoints
///
/// Every operation is scoped to `user_id`; another user's conversation
/// behaves exactly like a missing one.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create an empty conversation
    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<Conversation, ChatError>;

    /// Look up one conversation
    async fn get_conversation(&self, user_id: &str, conversation_id: &str) -> Result<Option<Conversation>, ChatError>;

    /// Conversations ordered by most recent change, newest first
    async fn list_conversations(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Conversation>, ChatError>;

    /// Change a conversation's title
    async fn rename_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
        title: &str,
    ) -> Result<Conversation, ChatError>;

    /// Remove a conversation; returns whether it existed
    async fn delete_conversation(&self, user_id: &str, conversation_id: &str) -> Result<bool, ChatError>;

    /// Append a message to an existing conversation
    async fn create_message(
        &self,
        id: &str,
        conversation_id: &str,
        user_id: &str,
        message: &Message,
    ) -> Result<StoredMessage, ChatError>;

    /// Messages of a conversation in creation order
    async fn get_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<StoredMessage>, ChatError>;

    /// Remove all messages of a conversation; returns how many were removed
    async fn delete_messages(&self, user_id: &str, conversation_id: &str) -> Result<usize, ChatError>;

    /// Set the feedback of one of the user's messages; `None` if no such message
    async fn update_message_feedback(
        &self,
        user_id: &str,
        message_id: &str,
        feedback: &str,
    ) -> Result<Option<StoredMessage>, ChatError>;

    /// Set the rating of one of the user's messages; `None` if no such message
    async fn update_message_rating(
        &self,
        user_id: &str,
        message_id: &str,
        rating: Value,
    ) -> Result<Option<StoredMessage>, ChatError>;

    /// Remove every conversation of the user with its messages; returns how many were removed
    async fn delete_all_conversations(&self, user_id: &str) -> Result<usize, ChatError>;

    /// Check that the store is reachable and usable
    async fn ensure(&self) -> Result<(), ChatError> {
        Ok(())
    }
}

/// Title derived from the first words of the most recent user message
pub fn generate_title(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .find(|message| message.role == Role::User)
        .and_then(Message::text_content)
        .map(|text| text.split_whitespace().take(TITLE_WORDS).collect::<Vec<_>>().join(" "))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_owned())
}

fn not_found(conversation_id: &str) -> ChatError {
    ChatError::NotFound(format!("conversation {conversation_id} was not found"))
}

#[derive(Debug)]
struct Record {
    conversation: Conversation,
    messages: Vec<StoredMessage>,
}

/// In-process conversation store
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    records: DashMap<String, Record>,
    sequence: AtomicU64,
}

impl MemoryConversationStore {
    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn touch(&self, conversation: &mut Conversation) {
        conversation.updated_at = Timestamp::now();
        conversation.sequence = self.next_sequence();
    }

    /// Apply `update` to the user's message with the given id
    fn update_message(
        &self,
        user_id: &str,
        message_id: &str,
        update: impl FnOnce(&mut StoredMessage),
    ) -> Option<StoredMessage> {
        let mut record = self
            .records
            .iter_mut()
            .filter(|record| record.conversation.user_id == user_id)
            .find(|record| record.messages.iter().any(|message| message.id == message_id))?;

        let message = record.messages.iter_mut().find(|message| message.id == message_id)?;
        message.updated_at = Some(Timestamp::now());
        update(message);

        Some(message.clone())
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn create_conversation(&self, user_id: &str, title: &str) -> Result<Conversation, ChatError> {
        let now = Timestamp::now();
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            title: title.to_owned(),
            created_at: now,
            updated_at: now,
            sequence: self.next_sequence(),
        };

        self.records.insert(
            conversation.id.clone(),
            Record {
                conversation: conversation.clone(),
                messages: Vec::new(),
            },
        );

        tracing::debug!(user = %user_id, conversation = %conversation.id, "created conversation");

        Ok(conversation)
    }

    async fn get_conversation(&self, user_id: &str, conversation_id: &str) -> Result<Option<Conversation>, ChatError> {
        Ok(self
            .records
            .get(conversation_id)
            .filter(|record| record.conversation.user_id == user_id)
            .map(|record| record.conversation.clone()))
    }

    async fn list_conversations(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Conversation>, ChatError> {
        let mut conversations: Vec<Conversation> = self
            .records
            .iter()
            .filter(|record| record.conversation.user_id == user_id)
            .map(|record| record.conversation.clone())
            .collect();

        conversations.sort_by(|a, b| b.sequence.cmp(&a.sequence));

        Ok(conversations.into_iter().skip(offset).take(limit).collect())
    }

    async fn rename_conversation(
        &self,
        user_id: &str,
        conversation_id: &str,
        title: &str,
    ) -> Result<Conversation, ChatError> {
        let mut record = self
            .records
            .get_mut(conversation_id)
            .filter(|record| record.conversation.user_id == user_id)
            .ok_or_else(|| not_found(conversation_id))?;

        record.conversation.title = title.to_owned();
        self.touch(&mut record.conversation);

        Ok(record.conversation.clone())
    }

    async fn delete_conversation(&self, user_id: &str, conversation_id: &str) -> Result<bool, ChatError> {
        Ok(self
            .records
            .remove_if(conversation_id, |_, record| record.conversation.user_id == user_id)
            .is_some())
    }

    async fn create_message(
        &self,
        id: &str,
        conversation_id: &str,
        user_id: &str,
        message: &Message,
    ) -> Result<StoredMessage, ChatError> {
        let mut record = self
            .records
            .get_mut(conversation_id)
            .filter(|record| record.conversation.user_id == user_id)
            .ok_or_else(|| not_found(conversation_id))?;

        let stored = StoredMessage {
            id: id.to_owned(),
            conversation_id: conversation_id.to_owned(),
            role: message.role,
            content: message.content.clone(),
            created_at: Timestamp::now(),
            updated_at: None,
            feedback: None,
            msgrating: None,
        };

        record.messages.push(stored.clone());
        self.touch(&mut record.conversation);

        Ok(stored)
    }

    async fn get_messages(&self, user_id: &str, conversation_id: &str) -> Result<Vec<StoredMessage>, ChatError> {
        Ok(self
            .records
            .get(conversation_id)
            .filter(|record| record.conversation.user_id == user_id)
            .map(|record| record.messages.clone())
            .unwrap_or_default())
    }

    async fn delete_messages(&self, user_id: &str, conversation_id: &str) -> Result<usize, ChatError> {
        let Some(mut record) = self
            .records
            .get_mut(conversation_id)
            .filter(|record| record.conversation.user_id == user_id)
        else {
            return Ok(0);
        };

        let removed = record.messages.len();
        record.messages.clear();

        Ok(removed)
    }

    async fn update_message_feedback(
        &self,
        user_id: &str,
        message_id: &str,
        feedback: &str,
    ) -> Result<Option<StoredMessage>, ChatError> {
        Ok(self.update_message(user_id, message_id, |message| {
            message.feedback = Some(feedback.to_owned());
        }))
    }

    async fn update_message_rating(
        &self,
        user_id: &str,
        message_id: &str,
        rating: Value,
    ) -> Result<Option<StoredMessage>, ChatError> {
        Ok(self.update_message(user_id, message_id, |message| {
            message.msgrating = Some(rating);
        }))
    }

    async fn delete_all_conversations(&self, user_id: &str) -> Result<usize, ChatError> {
        let mut removed = 0;
        self.records.retain(|_, record| {
            let owned = record.conversation.user_id == user_id;
            removed += usize::from(owned);
            !owned
        });

        tracing::debug!(user = %user_id, removed, "deleted all conversations");

        Ok(removed)
    }
}
