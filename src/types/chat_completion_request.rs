use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, ModelId};

/// Sampling temperature sent on every request.
pub const TEMPERATURE: f32 = 0.0;

/// Maximum number of tokens the model may produce per reply.
pub const MAX_TOKENS: u32 = 4096;

/// Body of a chat-completion request.
///
/// `stop` is always serialized, as `null` when no stop sequence is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionRequest {
    /// The model to complete with.
    pub model: ModelId,

    /// Conversation messages in order.
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum number of output tokens.
    pub max_tokens: u32,

    /// Whether the reply is streamed as server-sent events.
    pub stream: bool,

    /// Stop sequences.
    pub stop: Option<Vec<String>>,
}

impl ChatCompletionRequest {
    /// Create a streaming request with the fixed sampling parameters.
    pub fn new(model: ModelId, messages: Vec<ChatMessage>) -> Self {
        Self {
            model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: true,
            stop: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn request_serialization() {
        let request = ChatCompletionRequest::new(
            ModelId::Llama3x8b,
            vec![ChatMessage::system("ctx"), ChatMessage::user("hi")],
        );
        assert_eq!(
            to_value(&request).unwrap(),
            json!({
                "model": "llama3-8b-8192",
                "messages": [
                    {"role": "system", "content": "ctx"},
                    {"role": "user", "content": "hi"}
                ],
                "temperature": 0.0,
                "max_tokens": 4096,
                "stream": true,
                "stop": null
            })
        );
    }

    #[test]
    fn fixed_parameters() {
        let request = ChatCompletionRequest::new(ModelId::Gemma7bIt, vec![]);
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.max_tokens, 4096);
        assert!(request.stream);
        assert!(request.stop.is_none());
    }
}
