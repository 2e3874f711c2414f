//! Assembly of the chat-completion request for a turn.

use crate::config::Configuration;
use crate::transcript::Transcript;
use crate::types::{ChatCompletionRequest, ChatMessage, ModelId};

/// Build the message list for a request.
///
/// The system context and the seed assistant message come first on every
/// request, followed by the whole transcript in order.
pub fn assemble_messages(config: &Configuration, transcript: &Transcript) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(transcript.len() + 2);
    messages.push(ChatMessage::system(config.system_context.as_str()));
    messages.push(ChatMessage::assistant(
        config.seed_assistant_message.as_str(),
    ));
    messages.extend(transcript.iter().map(ChatMessage::from));
    messages
}

/// Build the streaming request for the given model.
pub fn build_request(
    config: &Configuration,
    transcript: &Transcript,
    model: ModelId,
) -> ChatCompletionRequest {
    ChatCompletionRequest::new(model, assemble_messages(config, transcript))
}
