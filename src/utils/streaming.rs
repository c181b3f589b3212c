//! Common streaming utilities
//!
//! Two wire framings recur across vendors and are implemented once here,
//! parameterized by a vendor-supplied "where is the text" extractor:
//!
//! - **SSE with a sentinel**: `data: {json}` lines, terminated either by a
//!   `data: [DONE]` frame or by the transport closing. Built on
//!   `eventsource-stream` for UTF-8 and line-buffer handling.
//! - **Newline-delimited JSON**: one JSON object per line, no sentinel,
//!   terminated by the transport closing.
//!
//! Both framings skip malformed frames and continue: vendors interleave
//! heartbeat and non-JSON lines with content frames, and forward progress
//! wins over strict parsing. Empty chunks are filtered so consumers never
//! see one.

use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::Stream;
use futures_util::StreamExt;

use crate::error::GatewayError;
use crate::stream::ChatStream;
use crate::types::ChatChunk;

/// The end-of-stream sentinel shared by every SSE vendor that uses one.
pub const SSE_DONE_SENTINEL: &str = "[DONE]";

/// Send a request and classify any failure before streaming starts:
/// timeouts and connection failures from the transport, 401/403 as auth
/// failures, any other non-2xx as an upstream error with its body.
pub(crate) async fn send_checked(
    request: reqwest::RequestBuilder,
    timeout_secs: u64,
) -> Result<reqwest::Response, GatewayError> {
    let response = request
        .send()
        .await
        .map_err(|e| GatewayError::from_reqwest(e, timeout_secs))?;
    if !response.status().is_success() {
        return Err(GatewayError::from_response(response).await);
    }
    Ok(response)
}

fn parse_frame<F>(payload: &str, extract: &F) -> Option<ChatChunk>
where
    F: Fn(&serde_json::Value) -> Option<ChatChunk>,
{
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(frame) => extract(&frame).filter(|chunk| !chunk.is_empty()),
        Err(error) => {
            tracing::debug!(%error, payload, "skipping unparsable stream frame");
            None
        }
    }
}

/// Decode an SSE byte stream into normalized chunks.
///
/// Exposed separately from [`StreamFactory::sse_stream`] so tests can feed
/// fixture bytes without an HTTP transport.
pub fn sse_chunk_stream<S, B, E, F>(bytes: S, extract: F) -> ChatStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: Fn(&serde_json::Value) -> Option<ChatChunk> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut events = Box::pin(bytes.eventsource());
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    let payload = event.data.trim();
                    if payload == SSE_DONE_SENTINEL {
                        break;
                    }
                    if payload.is_empty() {
                        continue;
                    }
                    if let Some(chunk) = parse_frame(payload, &extract) {
                        yield Ok(chunk);
                    }
                }
                Err(error) => {
                    yield Err(GatewayError::StreamError(format!(
                        "SSE transport error: {error}"
                    )));
                    break;
                }
            }
        }
    };
    Box::pin(stream)
}

/// Decode a newline-delimited JSON byte stream into normalized chunks.
///
/// Lines are split on `\n` with bytes accumulated across network chunks, so
/// a JSON object torn across reads is reassembled before parsing.
pub fn json_lines_chunk_stream<S, B, E, F>(bytes: S, extract: F) -> ChatStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: Fn(&serde_json::Value) -> Option<ChatChunk> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();
        loop {
            match bytes.next().await {
                Some(Ok(data)) => {
                    buffer.extend_from_slice(data.as_ref());
                    while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = buffer.drain(..=newline).collect();
                        let line = String::from_utf8_lossy(&line);
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if let Some(chunk) = parse_frame(line, &extract) {
                            yield Ok(chunk);
                        }
                    }
                }
                Some(Err(error)) => {
                    yield Err(GatewayError::StreamError(format!(
                        "stream transport error: {error}"
                    )));
                    break;
                }
                None => {
                    // Connection close terminates this framing; flush any
                    // unterminated final line first.
                    let tail = String::from_utf8_lossy(&buffer);
                    let tail = tail.trim();
                    if !tail.is_empty()
                        && let Some(chunk) = parse_frame(tail, &extract)
                    {
                        yield Ok(chunk);
                    }
                    break;
                }
            }
        }
    };
    Box::pin(stream)
}

/// Open the transport within the deadline. The deadline covers connect, send,
/// and response headers only; the body stream that follows runs as long as
/// the provider keeps generating, with no per-chunk or total-duration cap.
async fn open_within(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<reqwest::Response, GatewayError> {
    tokio::time::timeout(timeout, send_checked(request, timeout.as_secs()))
        .await
        .map_err(|_| GatewayError::Timeout(timeout.as_secs()))?
}

/// Factory tying the framing decoders to an HTTP request.
pub struct StreamFactory;

impl StreamFactory {
    /// Open an SSE stream: send the request, verify the status, then decode
    /// `data:` frames until the sentinel or transport close. `timeout` bounds
    /// the open handshake, never the open stream.
    pub async fn sse_stream<F>(
        request: reqwest::RequestBuilder,
        timeout: Duration,
        extract: F,
    ) -> Result<ChatStream, GatewayError>
    where
        F: Fn(&serde_json::Value) -> Option<ChatChunk> + Send + 'static,
    {
        let response = open_within(request, timeout).await?;
        Ok(sse_chunk_stream(response.bytes_stream(), extract))
    }

    /// Open a newline-delimited JSON stream. `timeout` bounds the open
    /// handshake, never the open stream.
    pub async fn json_lines_stream<F>(
        request: reqwest::RequestBuilder,
        timeout: Duration,
        extract: F,
    ) -> Result<ChatStream, GatewayError>
    where
        F: Fn(&serde_json::Value) -> Option<ChatChunk> + Send + 'static,
    {
        let response = open_within(request, timeout).await?;
        Ok(json_lines_chunk_stream(response.bytes_stream(), extract))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn byte_stream(
        frames: Vec<&'static str>,
    ) -> impl Stream<Item = Result<Vec<u8>, Infallible>> + Send + 'static {
        futures::stream::iter(frames.into_iter().map(|f| Ok(f.as_bytes().to_vec())))
    }

    fn text_extractor(frame: &serde_json::Value) -> Option<ChatChunk> {
        Some(ChatChunk::new(
            frame.get("text").and_then(|t| t.as_str()).map(str::to_owned),
            None,
        ))
    }

    async fn collect(stream: ChatStream) -> Vec<Result<ChatChunk, GatewayError>> {
        stream.collect::<Vec<_>>().await
    }

    #[tokio::test]
    async fn sse_sentinel_terminates_without_a_content_event() {
        let bytes = byte_stream(vec![
            "data: {\"text\":\"Hi\"}\n\n",
            "data: {\"text\":\" there\"}\n\n",
            "data: [DONE]\n\n",
            "data: {\"text\":\"after sentinel\"}\n\n",
        ]);
        let chunks = collect(sse_chunk_stream(bytes, text_extractor)).await;
        let texts: Vec<_> = chunks
            .into_iter()
            .map(|c| c.unwrap().text.unwrap())
            .collect();
        assert_eq!(texts, ["Hi", " there"]);
    }

    #[tokio::test]
    async fn sse_skips_malformed_and_empty_frames() {
        let bytes = byte_stream(vec![
            "data: not json at all\n\n",
            ": heartbeat comment\n\n",
            "data: {\"text\":\"\"}\n\n",
            "data: {\"other\":\"field\"}\n\n",
            "data: {\"text\":\"ok\"}\n\n",
        ]);
        let chunks = collect(sse_chunk_stream(bytes, text_extractor)).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().text.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn sse_frame_torn_across_reads_is_reassembled() {
        let bytes = byte_stream(vec!["data: {\"text\":\"Hel", "lo\"}\n\n", "data: [DONE]\n\n"]);
        let chunks = collect(sse_chunk_stream(bytes, text_extractor)).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().text.as_deref(), Some("Hello"));
    }

    #[tokio::test]
    async fn json_lines_parse_per_line_and_flush_tail() {
        let bytes = byte_stream(vec![
            "{\"text\":\"a\"}\n\n{\"text\":",
            "\"b\"}\n",
            "{\"text\":\"tail\"}",
        ]);
        let chunks = collect(json_lines_chunk_stream(bytes, text_extractor)).await;
        let texts: Vec<_> = chunks
            .into_iter()
            .map(|c| c.unwrap().text.unwrap())
            .collect();
        assert_eq!(texts, ["a", "b", "tail"]);
    }

    #[tokio::test]
    async fn json_lines_skip_garbage_lines() {
        let bytes = byte_stream(vec!["garbage\n{\"text\":\"kept\"}\n[\n"]);
        let chunks = collect(json_lines_chunk_stream(bytes, text_extractor)).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().text.as_deref(), Some("kept"));
    }
}
