//! Adapts a completion chunk stream into a stream of text fragments.

use futures::stream::{self, Stream, StreamExt};

use crate::Result;
use crate::observability::{STREAM_FRAGMENTS, STREAM_SKIPPED};
use crate::types::ChatCompletionChunk;

/// Yield the text carried by each chunk, in arrival order.
///
/// A chunk contributes a fragment only when it has at least one choice and the
/// first choice's delta has non-null content; every other chunk is skipped.
/// The adapter takes the chunk stream by value and holds nothing but the chunk
/// being inspected.  An error from the chunk stream is passed through as-is
/// and ends the fragment stream.
pub fn text_fragments<S>(chunks: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<ChatCompletionChunk>>,
{
    stream::unfold(
        (Box::pin(chunks), false),
        |(mut chunks, faulted)| async move {
            if faulted {
                return None;
            }
            loop {
                match chunks.next().await? {
                    Ok(chunk) => match chunk.text_delta() {
                        Some(text) => {
                            STREAM_FRAGMENTS.click();
                            return Some((Ok(text.to_string()), (chunks, false)));
                        }
                        None => {
                            STREAM_SKIPPED.click();
                        }
                    },
                    Err(err) => return Some((Err(err), (chunks, true))),
                }
            }
        },
    )
}

/// Concatenate a fragment stream into the full reply.
pub async fn collect_reply<S>(fragments: S) -> Result<String>
where
    S: Stream<Item = Result<String>>,
{
    let mut fragments = Box::pin(fragments);
    let mut reply = String::new();
    while let Some(fragment) = fragments.next().await {
        reply.push_str(&fragment?);
    }
    Ok(reply)
}
