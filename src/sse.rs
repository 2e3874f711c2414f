//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module turns the raw byte stream of a chat-completion response into a
//! stream of [`ChatCompletionChunk`]s.  Events are separated by a blank line,
//! each carries its payload on one or more `data:` lines, and the stream is
//! closed by a `data: [DONE]` event.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::types::{ApiErrorObject, ChatCompletionChunk};
use crate::{Error, Result};

/// Marker sent as the data of the final event.
const DONE_MARKER: &str = "[DONE]";

/// What a single SSE event decoded to.
#[derive(Debug)]
enum Decoded {
    Chunk(Result<ChatCompletionChunk>),
    Done,
    Skip,
}

/// Process a stream of bytes into a stream of completion chunks.
///
/// Bytes are buffered until a full event is available, so an event or a
/// multi-byte character split across network reads decodes correctly.  The
/// returned stream ends after `[DONE]`, at the end of the byte stream, or
/// right after yielding the first error.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<ChatCompletionChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    // Convert transport errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    stream::unfold(
        (stream, Vec::<u8>::new(), false),
        move |(mut stream, mut buffer, finished)| async move {
            if finished {
                return None;
            }
            loop {
                // First check if we have a complete event in the buffer
                if let Some((event, consumed)) = split_event(&buffer) {
                    let decoded = decode_event(&event);
                    buffer.drain(..consumed);
                    match decoded {
                        Decoded::Chunk(Ok(chunk)) => {
                            STREAM_EVENTS.click();
                            return Some((Ok(chunk), (stream, buffer, false)));
                        }
                        Decoded::Chunk(Err(err)) => {
                            STREAM_ERRORS.click();
                            return Some((Err(err), (stream, buffer, true)));
                        }
                        Decoded::Done => {
                            debug!("stream finished with [DONE]");
                            return None;
                        }
                        Decoded::Skip => continue,
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(err)) => {
                        STREAM_ERRORS.click();
                        return Some((Err(err), (stream, buffer, true)));
                    }
                    None => {
                        // End of stream; a final event may lack its blank line
                        if buffer.iter().all(u8::is_ascii_whitespace) {
                            return None;
                        }
                        let event = std::mem::take(&mut buffer);
                        return match decode_event(&event) {
                            Decoded::Chunk(Ok(chunk)) => {
                                STREAM_EVENTS.click();
                                Some((Ok(chunk), (stream, buffer, true)))
                            }
                            Decoded::Chunk(Err(err)) => {
                                STREAM_ERRORS.click();
                                Some((Err(err), (stream, buffer, true)))
                            }
                            Decoded::Done | Decoded::Skip => None,
                        };
                    }
                }
            }
        },
    )
}

/// Split the first complete event off the buffer.
///
/// Returns the event bytes and the number of bytes it occupied including its
/// terminating blank line.
fn split_event(buffer: &[u8]) -> Option<(Vec<u8>, usize)> {
    let mut i = 0;
    while i < buffer.len() {
        if buffer[i] == b'\n' {
            let rest = &buffer[i + 1..];
            if rest.starts_with(b"\n") {
                return Some((buffer[..i].to_vec(), i + 2));
            }
            if rest.starts_with(b"\r\n") {
                return Some((buffer[..i].to_vec(), i + 3));
            }
        }
        i += 1;
    }
    None
}

/// Decode one event.
fn decode_event(event: &[u8]) -> Decoded {
    let text = match std::str::from_utf8(event) {
        Ok(text) => text,
        Err(e) => {
            return Decoded::Chunk(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let mut data: Option<String> = None;
    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            match data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => data = Some(value.to_string()),
            }
        }
    }

    match data.as_deref().map(str::trim) {
        None | Some("") => Decoded::Skip,
        Some(DONE_MARKER) => Decoded::Done,
        Some(json_str) => Decoded::Chunk(parse_payload(json_str)),
    }
}

/// Parse the JSON payload of an event, which is either a chunk or an error.
///
/// Any payload with a non-null top-level `error` is an error, whatever the
/// shape of its value.
fn parse_payload(json_str: &str) -> Result<ChatCompletionChunk> {
    let value: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })?;
    if let Some(error) = value.get("error").filter(|error| !error.is_null()) {
        let error = match error {
            serde_json::Value::String(message) => ApiErrorObject {
                message: Some(message.clone()),
                ..ApiErrorObject::default()
            },
            other => serde_json::from_value::<ApiErrorObject>(other.clone()).unwrap_or_else(
                |_| ApiErrorObject {
                    message: Some(other.to_string()),
                    ..ApiErrorObject::default()
                },
            ),
        };
        warn!(detail = ?error.message, "provider reported an error mid-stream");
        return Err(Error::api(
            None,
            error.error_type.or(error.code),
            error
                .message
                .unwrap_or_else(|| "error reported in stream".to_string()),
            None,
        ));
    }
    serde_json::from_value::<ChatCompletionChunk>(value).map_err(|e| {
        Error::serialization(
            format!("Failed to parse event JSON: {e}"),
            Some(Box::new(e)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::io;

    fn byte_stream(
        parts: &[&'static [u8]],
    ) -> impl Stream<Item = std::result::Result<Bytes, io::Error>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|part| Ok(Bytes::from_static(*part)))
                .collect::<Vec<_>>(),
        )
    }

    async fn texts(parts: &[&'static [u8]]) -> Result<Vec<Option<String>>> {
        process_sse(byte_stream(parts))
            .map_ok(|chunk| chunk.text_delta().map(str::to_string))
            .try_collect()
            .await
    }

    #[tokio::test]
    async fn decodes_events_until_done() {
        let body: &'static [u8] = b"data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n\
data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n\
data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n\
data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n\
data: [DONE]\n\n\
data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"after done\"}}]}\n\n";
        let texts = texts(&[body]).await.unwrap();
        assert_eq!(
            texts,
            vec![
                Some(String::new()),
                Some("Hel".to_string()),
                Some("lo".to_string()),
                None
            ]
        );
    }

    #[tokio::test]
    async fn events_split_across_reads() {
        let texts = texts(&[
            b"da",
            b"ta: {\"choices\":[{\"delta\":{\"con",
            b"tent\":\"a\"}}]}\n",
            b"\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\ndata: [DO",
            b"NE]\n\n",
        ])
        .await
        .unwrap();
        assert_eq!(texts, vec![Some("a".to_string()), Some("b".to_string())]);
    }

    #[tokio::test]
    async fn crlf_and_comments() {
        let texts = texts(&[
            b": keep-alive\r\n\r\ndata: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n",
        ])
        .await
        .unwrap();
        assert_eq!(texts, vec![Some("x".to_string())]);
    }

    #[tokio::test]
    async fn utf8_split_across_reads() {
        // "é" is 0xC3 0xA9
        let texts = texts(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"caf\xC3",
            b"\xA9\"}}]}\n\n",
        ])
        .await
        .unwrap();
        assert_eq!(texts, vec![Some("café".to_string())]);
    }

    #[tokio::test]
    async fn trailing_event_without_blank_line() {
        let texts = texts(&[b"data: {\"choices\":[{\"delta\":{\"content\":\"z\"}}]}"])
            .await
            .unwrap();
        assert_eq!(texts, vec![Some("z".to_string())]);
    }

    #[tokio::test]
    async fn empty_body_is_empty_stream() {
        let texts = texts(&[]).await.unwrap();
        assert!(texts.is_empty());
    }

    #[tokio::test]
    async fn error_event_terminates_stream() {
        let mut stream = Box::pin(process_sse(byte_stream(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n",
            b"data: {\"error\":{\"message\":\"model overloaded\",\"type\":\"server_error\"}}\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n\n",
        ])));
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.text_delta(), Some("partial"));
        let err = stream.next().await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "server_error: model overloaded");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn bare_string_error_is_not_a_chunk() {
        let err = texts(&[
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hal\"}}]}\n\n",
            b"data: {\"error\":\"model overloaded\"}\n\n",
        ])
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Api { status_code: None, .. }));
        assert!(err.to_string().contains("model overloaded"));
    }

    #[test]
    fn unusual_error_shapes_are_errors() {
        for payload in [r#"{"error":{"code":503}}"#, r#"{"error":true,"choices":[]}"#] {
            let err = parse_payload(payload).unwrap_err();
            assert!(matches!(err, Error::Api { .. }), "{payload}: {err:?}");
        }
        assert!(parse_payload(r#"{"error":null,"choices":[]}"#).is_ok());
    }

    #[tokio::test]
    async fn invalid_json_is_serialization_error() {
        let err = texts(&[b"data: {not json}\n\n"]).await.unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[tokio::test]
    async fn transport_error_is_streaming_error() {
        let parts: Vec<std::result::Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n",
            )),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n",
            )),
        ];
        let results: Vec<_> = process_sse(stream::iter(parts)).collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].as_ref().unwrap_err().is_streaming());
    }

    #[test]
    fn multi_line_data_is_joined() {
        match decode_event(b"data: {\"choices\":\ndata: []}") {
            Decoded::Chunk(Ok(chunk)) => assert!(chunk.choices.is_empty()),
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[test]
    fn event_without_data_is_skipped() {
        assert!(matches!(decode_event(b"event: ping"), Decoded::Skip));
    }
}
