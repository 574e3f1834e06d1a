use super::message::{Message, Role};

/// Normalized input for one provider round-trip
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Conversation so far, chronological
    pub messages: Vec<Message>,
    /// Conversation key used for webhook session derivation
    pub conversation_id: Option<String>,
    /// Resolved end-user identifier
    pub user_id: String,
    /// First hop of `x-forwarded-for`, when present
    pub client_ip: Option<String>,
}

impl ChatRequest {
    /// Create a request for the given user
    pub fn new(messages: Vec<Message>, user_id: impl Into<String>) -> Self {
        Self {
            messages,
            conversation_id: None,
            user_id: user_id.into(),
            client_ip: None,
        }
    }

    /// Most recent message authored by the user
    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// Whether the conversation currently ends with a user turn
    pub fn ends_with_user(&self) -> bool {
        self.messages.last().is_some_and(|m| m.role == Role::User)
    }
}
