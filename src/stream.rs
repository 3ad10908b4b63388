//! Chat-completion event streams.
//!
//! [`create_event_stream`] turns the live SSE body of a streaming completion
//! into an [`EventStream`] of decoded events. A dedicated task reads the body
//! and is the only writer of a bounded channel; the consumer pulls from the
//! other end. When the channel is full the reader stops pulling bytes, so
//! buffering is bounded by the transport's own flow control.
//!
//! The stream ends normally on the `[DONE]` sentinel or at the end of the
//! body. An undecodable frame or a transport failure is yielded as an error
//! and ends the stream: a token sequence with a hole in it is useless to the
//! consumer.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::http::ByteStream;
use crate::sse;

pub use crate::options::DEFAULT_STREAM_CAPACITY;

/// Callback invoked with every event pushed onto an [`EventStream`].
pub type EventCallback<T> = Box<dyn FnMut(&T) + Send + 'static>;

/// Stream of decoded events produced by [`create_event_stream`].
///
/// Dropping it stops the reader task and releases the connection.
#[derive(Debug)]
pub struct EventStream<T> {
    receiver: mpsc::Receiver<Result<T, ClientError>>,
}

impl<T> Stream for EventStream<T> {
    type Item = Result<T, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

/// Decode `source` into a stream of `T`.
///
/// `on_event`, when given, sees every event pushed onto the output stream,
/// and only those. `capacity` bounds the number of decoded events waiting
/// for the consumer.
///
/// Must be called from within a Tokio runtime.
///
/// # Example
/// ```
/// use bytes::Bytes;
/// use futures::StreamExt;
/// use pollen::sse::byte_stream_from_chunks;
/// use pollen::stream::create_event_stream;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = byte_stream_from_chunks(vec![Bytes::from_static(
///     b"data: {\"a\":1}\n\ndata: [DONE]\n\ndata: {\"a\":2}\n\n",
/// )]);
/// let events: Vec<_> = create_event_stream::<serde_json::Value>(source, None, 8)
///     .collect()
///     .await;
/// assert_eq!(events.len(), 1);
/// # }
/// ```
pub fn create_event_stream<T>(
    source: ByteStream,
    on_event: Option<EventCallback<T>>,
    capacity: usize,
) -> EventStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    tokio::spawn(pump(source, sender, on_event));
    EventStream { receiver }
}

async fn pump<T>(
    source: ByteStream,
    sender: mpsc::Sender<Result<T, ClientError>>,
    mut on_event: Option<EventCallback<T>>,
) where
    T: DeserializeOwned + Send + 'static,
{
    let frames = sse::frames(source);
    futures::pin_mut!(frames);

    loop {
        let next = tokio::select! {
            biased;
            _ = sender.closed() => {
                debug!("event stream dropped by consumer");
                return;
            }
            next = frames.next() => next,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                warn!(error = %e, "event stream transport failed");
                let _ = sender.send(Err(ClientError::Stream(e))).await;
                return;
            }
            None => {
                debug!("event stream ended without sentinel");
                return;
            }
        };

        if frame.is_done() {
            debug!("event stream finished");
            return;
        }

        match frame.decode::<T>() {
            Ok(event) => {
                // the slot is held before the callback runs, so the push cannot fail
                let Ok(permit) = sender.reserve().await else {
                    debug!("event stream dropped by consumer");
                    return;
                };
                if let Some(on_event) = on_event.as_mut() {
                    on_event(&event);
                }
                permit.send(Ok(event));
            }
            Err(e) => {
                warn!(error = %e, "undecodable event stream frame");
                let _ = sender.send(Err(ClientError::StreamEvent(e))).await;
                return;
            }
        }
    }
}
