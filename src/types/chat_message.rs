use serde::{Deserialize, Serialize};

use crate::transcript::{Role, Turn};

/// Role of a message sent to the completion endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System role, used for the conversation context.
    System,

    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => MessageRole::User,
            Role::Assistant => MessageRole::Assistant,
        }
    }
}

/// A single message of a chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// The role of the message.
    pub role: MessageRole,

    /// The text content of the message.
    pub content: String,
}

impl ChatMessage {
    /// Create a new `ChatMessage` with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system `ChatMessage`.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a new user `ChatMessage`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant `ChatMessage`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self::new(turn.role().into(), turn.content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn system_message_serialization() {
        let message = ChatMessage::system("Be terse.");
        assert_eq!(
            to_value(&message).unwrap(),
            json!({
                "role": "system",
                "content": "Be terse."
            })
        );
    }

    #[test]
    fn message_deserialization() {
        let message: ChatMessage =
            serde_json::from_value(json!({"role": "assistant", "content": "Hi"})).unwrap();
        assert_eq!(message, ChatMessage::assistant("Hi"));
    }

    #[test]
    fn from_turn_keeps_role_and_content() {
        let turn = Turn::user("hello");
        let message = ChatMessage::from(&turn);
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.content, "hello");

        let turn = Turn::assistant("hi there");
        assert_eq!(ChatMessage::from(&turn), ChatMessage::assistant("hi there"));
    }
}
