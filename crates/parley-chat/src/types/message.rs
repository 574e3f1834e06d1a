use serde::{Deserialize, Serialize};

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// End user
    User,
    /// Model reply
    Assistant,
    /// Result of a function call
    Function,
    /// Retrieval context stored alongside history
    Tool,
}

/// One entry of a conversation
///
/// Messages arrive from the frontend and are only ever appended to, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Frontend-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Author role
    pub role: Role,
    /// Text, structured parts, or null
    #[serde(default)]
    pub content: Option<Content>,
    /// Function name for `function` messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Function call requested by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// Identifier of the tool call a `function` message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Retrieval context (citations); history stores it as a JSON string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl Message {
    fn bare(role: Role, content: Option<Content>) -> Self {
        Self {
            id: None,
            role,
            content,
            name: None,
            function_call: None,
            tool_call_id: None,
            context: None,
        }
    }

    /// A plain-text message
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::bare(role, Some(Content::Text(text.into())))
    }

    /// A user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// An assistant message requesting a function call, content null
    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::bare(Role::Assistant, None)
        }
    }

    /// A function result message
    pub fn function_result(name: String, result: String, tool_call_id: Option<String>) -> Self {
        Self {
            name: Some(name),
            tool_call_id,
            ..Self::bare(Role::Function, Some(Content::Text(result)))
        }
    }

    /// Text of the message; structured content yields its first text part
    pub fn text_content(&self) -> Option<&str> {
        self.content.as_ref().and_then(Content::first_text)
    }
}

/// Message content, either plain text or structured parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text
    Text(String),
    /// Array of content parts (text, images)
    Parts(Vec<ContentPart>),
}

impl Content {
    /// The text itself, or the first text part
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Parts(parts) => parts.iter().find_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::ImageUrl { .. } => None,
            }),
        }
    }
}

/// Individual part within a structured message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text block
    Text {
        /// The text string
        text: String,
    },
    /// Image reference, passed through untouched
    ImageUrl {
        /// `{url, detail?}` object
        image_url: serde_json::Value,
    },
}

/// Function name and its JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// JSON-encoded arguments, as produced by the model
    pub arguments: String,
}
