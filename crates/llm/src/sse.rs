//! Line framing for streamed HTTP bodies.
//!
//! Both providers stream line-oriented bodies: OpenAI sends Server-Sent
//! Events (`data: {...}` lines), Ollama sends newline-delimited JSON. Network
//! chunks do not respect line boundaries, so bytes are buffered until a full
//! line is available.

use bytes::{Bytes, BytesMut};
use cookbook_core::{AppError, AppResult};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

/// Split a byte stream into complete, non-empty lines.
///
/// Trailing `\r` is stripped. Whatever remains in the buffer when the body
/// ends is yielded as a final line. A read error is yielded once as
/// `AppError::Generation` and ends the stream.
pub fn byte_lines<S, E>(byte_stream: S) -> BoxStream<'static, AppResult<String>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    futures::stream::unfold(
        (Box::pin(byte_stream), BytesMut::with_capacity(8192), false),
        |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let line = String::from_utf8_lossy(&line_bytes).into_owned();
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Some((Ok(line), (stream, buffer, false)));
                }

                match stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        tracing::warn!("Stream read error: {}", e);
                        let err = AppError::Generation(format!("Stream interrupted: {}", e));
                        return Some((Err(err), (stream, buffer, true)));
                    }
                    None => {
                        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
                        buffer.clear();
                        if rest.is_empty() {
                            return None;
                        }
                        return Some((Ok(rest), (stream, buffer, true)));
                    }
                }
            }
        },
    )
    .boxed()
}

/// Payload OpenAI sends as its final `data:` line.
pub const SSE_DONE: &str = "[DONE]";

/// Extract the payload of an SSE `data:` line.
///
/// Returns `None` for comments, other fields and empty payloads. The
/// [`SSE_DONE`] marker is passed through so callers can end the stream.
pub fn extract_sse_data(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))?
        .trim();

    if data.is_empty() {
        return None;
    }
    Some(data)
}
