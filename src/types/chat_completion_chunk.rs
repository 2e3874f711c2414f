use serde::{Deserialize, Serialize};

/// One server-sent event of a streamed chat completion.
///
/// Fields the provider adds beyond these (usage blocks, log probabilities)
/// are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionChunk {
    /// Completion identifier shared by every chunk of one reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Object type, normally `chat.completion.chunk`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    /// Unix timestamp of the completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,

    /// Model that produced the chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Choices carried by this chunk; may be empty.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    /// Create a chunk carrying one choice whose delta has the given content.
    pub fn with_content(content: Option<&str>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChoiceDelta {
                    role: None,
                    content: content.map(str::to_string),
                },
                finish_reason: None,
            }],
            ..Self::default()
        }
    }

    /// The incremental text of the first choice, if there is one.
    pub fn text_delta(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }
}

/// A choice within a streamed chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkChoice {
    /// Index of the choice.
    #[serde(default)]
    pub index: u32,

    /// The incremental change carried by this chunk.
    #[serde(default)]
    pub delta: ChoiceDelta,

    /// Why generation stopped, on the last chunk of a choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Incremental content of a choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChoiceDelta {
    /// Role, sent on the first chunk only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Text fragment; absent or null on role-only and final chunks.
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_value, json};

    #[test]
    fn chunk_deserialization() {
        let chunk: ChatCompletionChunk = from_value(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion.chunk",
            "created": 1713400000,
            "model": "llama3-70b-8192",
            "system_fingerprint": "fp_abc",
            "choices": [{
                "index": 0,
                "delta": {"content": "Hello"},
                "logprobs": null,
                "finish_reason": null
            }]
        }))
        .unwrap();
        assert_eq!(chunk.id.as_deref(), Some("chatcmpl-123"));
        assert_eq!(chunk.text_delta(), Some("Hello"));
    }

    #[test]
    fn role_only_chunk_has_no_text() {
        let chunk: ChatCompletionChunk = from_value(json!({
            "choices": [{"index": 0, "delta": {"role": "assistant"}}]
        }))
        .unwrap();
        assert_eq!(chunk.choices[0].delta.role.as_deref(), Some("assistant"));
        assert_eq!(chunk.text_delta(), None);
    }

    #[test]
    fn final_chunk_with_usage() {
        let chunk: ChatCompletionChunk = from_value(json!({
            "id": "chatcmpl-123",
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
            "x_groq": {"id": "req_1", "usage": {"prompt_tokens": 10, "completion_tokens": 3}}
        }))
        .unwrap();
        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(chunk.text_delta(), None);
    }

    #[test]
    fn missing_choices_defaults_to_empty() {
        let chunk: ChatCompletionChunk = from_value(json!({"id": "x"})).unwrap();
        assert!(chunk.choices.is_empty());
        assert_eq!(chunk.text_delta(), None);
    }

    #[test]
    fn null_content() {
        let chunk: ChatCompletionChunk = from_value(json!({
            "choices": [{"delta": {"content": null}}]
        }))
        .unwrap();
        assert_eq!(chunk, ChatCompletionChunk::with_content(None));
    }

    #[test]
    fn only_first_choice_counts() {
        let mut chunk = ChatCompletionChunk::with_content(None);
        chunk.choices.push(ChunkChoice {
            index: 1,
            delta: ChoiceDelta {
                role: None,
                content: Some("ignored".to_string()),
            },
            finish_reason: None,
        });
        assert_eq!(chunk.text_delta(), None);
    }
}
