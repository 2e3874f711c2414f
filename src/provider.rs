//! The seam between a chat session and whatever produces completions.

use std::pin::Pin;

use futures::Stream;

use crate::Result;
use crate::types::{ChatCompletionChunk, ChatCompletionRequest};

/// A stream of completion chunks for one request.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// Something that can open a streamed chat completion.
///
/// Implementations perform exactly one exchange per call: no retries, no
/// caching, no rate limiting.  A fault before the stream opens is returned
/// directly; a fault after it opens arrives as an `Err` item of the stream.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Open a streamed completion for the request.
    async fn stream_completion(&self, request: ChatCompletionRequest) -> Result<ChunkStream>;
}

#[async_trait::async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for &P {
    async fn stream_completion(&self, request: ChatCompletionRequest) -> Result<ChunkStream> {
        (**self).stream_completion(request).await
    }
}

#[async_trait::async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for std::sync::Arc<P> {
    async fn stream_completion(&self, request: ChatCompletionRequest) -> Result<ChunkStream> {
        (**self).stream_completion(request).await
    }
}
