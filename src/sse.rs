//! Server-Sent Events (SSE) frame splitting.
//!
//! The API streams frames separated by a blank line, using either line ending
//! convention:
//! ```text
//! data: {"key": "value"}
//!
//! data: {"another": "event"}
//!
//! data: [DONE]
//! ```
//!
//! Only frames whose first line starts with `data:` are significant. Comments,
//! keep-alives and other fields are dropped without error.
//!
//! [`split_frames`] is the single primitive shared by the feed dispatcher and
//! the chat stream transformer. It is stateless: the caller owns the carry
//! buffer and hands it back in with every chunk.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::http::{ByteStream, TransportError};

/// Prefix of the only significant field.
pub const DATA_PREFIX: &str = "data:";

/// Payload marking the normal end of a chat-completion stream.
pub const DONE_MARKER: &str = "[DONE]";

const DEFAULT_PAYLOAD: &str = "{}";

const MAX_SEPARATOR_LEN: usize = 4;

/// A complete event frame that passed the `data:` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Payload of the frame's first `data:` line.
    pub data: String,
}

impl Frame {
    /// Decode the payload as JSON.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.data)
    }

    /// Whether this frame is the end-of-stream sentinel.
    pub fn is_done(&self) -> bool {
        is_done_marker(&self.data)
    }
}

/// Split `carry + chunk` into complete frames and the new carry.
///
/// `carry` must be empty or the carry returned by the previous call.
///
/// The trailing fragment always becomes the new carry, even when it already
/// looks complete; it is only emitted once a later separator confirms it (or
/// when [`flush_carry`] is called at end of stream).
///
/// # Example
/// ```
/// use bytes::BytesMut;
/// use pollen::sse::split_frames;
///
/// let (frames, carry) = split_frames(BytesMut::new(), b"data: {\"a\":1}\n\ndata: {\"b\"");
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].data, "{\"a\":1}");
///
/// let (frames, carry) = split_frames(carry, b":2}\n\n");
/// assert_eq!(frames[0].data, "{\"b\":2}");
/// assert!(carry.is_empty());
/// ```
pub fn split_frames(mut carry: BytesMut, chunk: &[u8]) -> (Vec<Frame>, BytesMut) {
    // a carry never holds a whole separator, so only its tail can start one
    let mut scan_from = carry.len().saturating_sub(MAX_SEPARATOR_LEN - 1);
    carry.extend_from_slice(chunk);

    let mut frames = Vec::new();
    let mut start = 0;
    while let Some((offset, separator_len)) = find_separator(&carry[scan_from..]) {
        let end = scan_from + offset;
        if let Some(frame) = parse_frame(&carry[start..end]) {
            frames.push(frame);
        }
        start = end + separator_len;
        scan_from = start;
    }

    let _ = carry.split_to(start);
    (frames, carry)
}

/// Offer the leftover carry as a final frame once the stream has ended.
pub fn flush_carry(carry: &[u8]) -> Option<Frame> {
    parse_frame(carry)
}

/// Extract the payload of the first `data:` line of a frame.
///
/// At most one leading space is removed, along with a trailing `\r`.
///
/// # Example
/// ```
/// use pollen::sse::extract_data;
///
/// assert_eq!(extract_data("data: {\"key\": 1}"), Some("{\"key\": 1}"));
/// assert_eq!(extract_data("event: ping\ndata:[DONE]"), Some("[DONE]"));
/// assert_eq!(extract_data(": keep-alive"), None);
/// ```
pub fn extract_data(frame: &str) -> Option<&str> {
    frame.split('\n').find_map(|line| {
        let value = line.strip_prefix(DATA_PREFIX)?;
        let value = value.strip_suffix('\r').unwrap_or(value);
        Some(value.strip_prefix(' ').unwrap_or(value))
    })
}

/// Check if a payload indicates the stream is done.
///
/// # Example
/// ```
/// use pollen::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(is_done_marker(" [DONE] "));
/// assert!(!is_done_marker("{\"data\": \"[DONE]\"}"));
/// ```
pub fn is_done_marker(data: &str) -> bool {
    data.trim() == DONE_MARKER
}

/// Turn a live byte stream into a stream of frames.
///
/// Transport errors are yielded once and end the stream. On a clean end the
/// carry is flushed as a best-effort last frame.
pub fn frames(source: ByteStream) -> impl Stream<Item = Result<Frame, TransportError>> + Send {
    stream::unfold(
        (source, BytesMut::new(), VecDeque::new(), false),
        |(mut source, mut carry, mut pending, mut finished)| async move {
            loop {
                if let Some(frame) = pending.pop_front() {
                    return Some((Ok(frame), (source, carry, pending, finished)));
                }

                if finished {
                    return None;
                }

                match source.next().await {
                    Some(Ok(chunk)) => {
                        let (complete, rest) = split_frames(carry, &chunk);
                        carry = rest;
                        pending.extend(complete);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (source, BytesMut::new(), pending, true)));
                    }
                    None => {
                        finished = true;
                        pending.extend(flush_carry(&carry));
                        carry.clear();
                    }
                }
            }
        },
    )
}

fn find_separator(buf: &[u8]) -> Option<(usize, usize)> {
    (0..buf.len()).find_map(|i| {
        let rest = &buf[i..];
        if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else {
            None
        }
    })
}

fn parse_frame(raw: &[u8]) -> Option<Frame> {
    let text = String::from_utf8_lossy(raw);
    if !text.starts_with(DATA_PREFIX) {
        return None;
    }

    let data = extract_data(&text)
        .filter(|data| !data.trim().is_empty())
        .unwrap_or(DEFAULT_PAYLOAD);
    Some(Frame {
        data: data.to_string(),
    })
}

/// Build a [`ByteStream`] from in-memory chunks.
pub fn byte_stream_from_chunks<I>(chunks: I) -> ByteStream
where
    I: IntoIterator<Item = Bytes>,
    I::IntoIter: Send + 'static,
{
    Box::pin(stream::iter(chunks).map(Ok))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_all(chunks: &[&str]) -> (Vec<String>, BytesMut) {
        let mut carry = BytesMut::new();
        let mut out = Vec::new();
        for chunk in chunks {
            let (frames, rest) = split_frames(carry, chunk.as_bytes());
            out.extend(frames.into_iter().map(|f| f.data));
            carry = rest;
        }
        (out, carry)
    }

    #[test]
    fn test_split_single_chunk() {
        let (frames, carry) = split_all(&["data: {\"a\":1}\n\ndata: {\"a\":2}\n\n"]);
        assert_eq!(frames, vec!["{\"a\":1}", "{\"a\":2}"]);
        assert!(carry.is_empty());
    }

    #[test]
    fn test_trailing_fragment_is_carried() {
        let (frames, carry) = split_all(&["data: {\"a\":1}"]);
        assert!(frames.is_empty());
        assert_eq!(&carry[..], b"data: {\"a\":1}");
    }

    #[test]
    fn test_split_across_chunk_boundary() {
        let (frames, carry) = split_all(&["data: {\"incomplete", "\": true}\n\n"]);
        assert_eq!(frames, vec!["{\"incomplete\": true}"]);
        assert!(carry.is_empty());
    }

    #[test]
    fn test_split_inside_separator() {
        let (frames, _) = split_all(&["data: {\"a\":1}\n", "\ndata: {\"a\":2}\r\n\r", "\n"]);
        assert_eq!(frames, vec!["{\"a\":1}", "{\"a\":2}"]);
    }

    #[test]
    fn test_every_split_point_yields_the_same_frames() {
        let input = "data: {\"a\":1}\r\n\r\n: ping\n\ndata: {\"b\":\"x y\"}\n\n";
        let (expected, _) = split_all(&[input]);
        assert_eq!(expected, vec!["{\"a\":1}", "{\"b\":\"x y\"}"]);

        for i in 0..=input.len() {
            let (head, tail) = input.split_at(i);
            let (frames, carry) = split_all(&[head, tail]);
            assert_eq!(frames, expected, "split at {}", i);
            assert!(carry.is_empty());
        }
    }

    #[test]
    fn test_one_byte_per_chunk() {
        let input = "data: {\"n\":1}\r\n\r\n: ping\n\ndata: {\"n\":2}\n\ndata:{\"n\":3}\r\n\r\n";
        let chunks: Vec<&str> = (0..input.len()).map(|i| &input[i..i + 1]).collect();

        let (frames, carry) = split_all(&chunks);
        assert_eq!(frames, vec!["{\"n\":1}", "{\"n\":2}", "{\"n\":3}"]);
        assert!(carry.is_empty());
    }

    #[test]
    fn test_empty_payload_defaults_to_empty_object() {
        let (frames, _) = split_all(&["data: {\"a\":1}\n\ndata:\n\ndata: \r\n\r\ndata: {\"a\":2}\n\n"]);
        assert_eq!(frames, vec!["{\"a\":1}", "{}", "{}", "{\"a\":2}"]);
        assert_eq!(flush_carry(b"data:"), Some(Frame { data: "{}".to_string() }));
    }

    #[test]
    fn test_non_data_frames_are_dropped() {
        let (frames, _) = split_all(&[": keep-alive\n\nevent: ping\n\n\n\ndata: {}\n\n"]);
        assert_eq!(frames, vec!["{}"]);
    }

    #[test]
    fn test_first_data_line_wins() {
        let (frames, _) = split_all(&["data: {\"first\":1}\nid: 7\ndata: {\"second\":2}\n\n"]);
        assert_eq!(frames, vec!["{\"first\":1}"]);
    }

    #[test]
    fn test_only_one_leading_space_is_removed() {
        assert_eq!(extract_data("data:  x"), Some(" x"));
        assert_eq!(extract_data("data:x"), Some("x"));
        assert_eq!(extract_data("data: x\r"), Some("x"));
    }

    #[test]
    fn test_multibyte_split_is_preserved() {
        let input = "data: {\"t\":\"héllo\"}\n\n".as_bytes();
        let cut = input.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let (frames, carry) = split_frames(BytesMut::new(), &input[..cut]);
        assert!(frames.is_empty());
        let (frames, _) = split_frames(carry, &input[cut..]);
        assert_eq!(frames[0].data, "{\"t\":\"héllo\"}");
    }

    #[test]
    fn test_garbage_does_not_panic() {
        let (frames, carry) = split_frames(BytesMut::new(), &[0xff, 0xfe, b'\n', b'\n', 0x00]);
        assert!(frames.is_empty());
        assert_eq!(&carry[..], &[0x00]);
    }

    #[test]
    fn test_flush_carry() {
        assert_eq!(
            flush_carry(b"data: {\"last\":true}\n"),
            Some(Frame {
                data: "{\"last\":true}".to_string()
            })
        );
        assert_eq!(flush_carry(b""), None);
        assert_eq!(flush_carry(b": comment"), None);
    }

    #[test]
    fn test_frame_decode_and_done() {
        let frame = Frame {
            data: "{\"a\":1}".to_string(),
        };
        let value: serde_json::Value = frame.decode().unwrap();
        assert_eq!(value["a"], 1);
        assert!(!frame.is_done());

        let done = Frame {
            data: "[DONE]".to_string(),
        };
        assert!(done.is_done());
        assert!(done.decode::<serde_json::Value>().is_err());
    }

    #[tokio::test]
    async fn test_frames_stream_flushes_and_orders() {
        let source = byte_stream_from_chunks(vec![
            Bytes::from_static(b"data: {\"n\":1}\n\ndata: {\"n\""),
            Bytes::from_static(b":2}\n\ndata: {\"n\":3}"),
        ]);
        let frames: Vec<_> = frames(source).map(|f| f.unwrap().data).collect().await;
        assert_eq!(frames, vec!["{\"n\":1}", "{\"n\":2}", "{\"n\":3}"]);
    }

    #[tokio::test]
    async fn test_frames_stream_stops_after_error() {
        let source: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"data: {}\n\n")),
            Err(TransportError::from("reset")),
            Ok(Bytes::from_static(b"data: {\"late\":1}\n\n")),
        ]));
        let items: Vec<_> = frames(source).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(items[1].as_ref().unwrap_err().to_string(), "reset");
    }
}
