//! Scripted transport used by unit tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use parking_lot::Mutex;
use serde_json::Value;

use crate::client::ClientError;
use crate::http::{ByteStream, HttpClient, TransportError};
use crate::sse::byte_stream_from_chunks;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: &'static str,
    pub target: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

/// Answers requests from queues filled by the test, recording every call.
#[derive(Default)]
pub(crate) struct MockHttpClient {
    requests: Mutex<Vec<RecordedRequest>>,
    bodies: Mutex<VecDeque<Result<Bytes, ClientError>>>,
    streams: Mutex<VecDeque<Result<ByteStream, ClientError>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, body: impl Into<Bytes>) -> Self {
        self.bodies.lock().push_back(Ok(body.into()));
        self
    }

    pub fn with_body_error(self, err: ClientError) -> Self {
        self.bodies.lock().push_back(Err(err));
        self
    }

    pub fn with_stream(self, stream: ByteStream) -> Self {
        self.streams.lock().push_back(Ok(stream));
        self
    }

    pub fn with_stream_error(self, err: ClientError) -> Self {
        self.streams.lock().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    fn record(&self, method: &'static str, target: &str, body: Option<&Value>, headers: &[(&str, &str)]) {
        self.requests.lock().push(RecordedRequest {
            method,
            target: target.to_string(),
            body: body.cloned(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }

    fn next_body(&self) -> Result<Bytes, ClientError> {
        self.bodies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Request("no scripted body".into())))
    }

    fn next_stream(&self) -> Result<ByteStream, ClientError> {
        self.streams
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Request("no scripted stream".into())))
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, target: &str) -> Result<Bytes, ClientError> {
        self.record("GET", target, None, &[]);
        self.next_body()
    }

    async fn post_json(&self, target: &str, body: &Value) -> Result<Bytes, ClientError> {
        self.record("POST", target, Some(body), &[]);
        self.next_body()
    }

    async fn get_stream(
        &self,
        target: &str,
        headers: &[(&str, &str)],
    ) -> Result<ByteStream, ClientError> {
        self.record("GET", target, None, headers);
        self.next_stream()
    }

    async fn post_stream(
        &self,
        target: &str,
        body: &Value,
        headers: &[(&str, &str)],
    ) -> Result<ByteStream, ClientError> {
        self.record("POST", target, Some(body), headers);
        self.next_stream()
    }
}

/// A byte stream made of the given text chunks.
pub(crate) fn text_chunks(chunks: &[&str]) -> ByteStream {
    byte_stream_from_chunks(
        chunks
            .iter()
            .map(|c| Bytes::copy_from_slice(c.as_bytes()))
            .collect::<Vec<_>>(),
    )
}

/// A byte stream fed by the returned sender; dropping the sender ends it.
pub(crate) fn channel_stream() -> (
    mpsc::UnboundedSender<Result<Bytes, TransportError>>,
    ByteStream,
) {
    let (tx, rx) = mpsc::unbounded();
    (tx, Box::pin(rx))
}

pub(crate) fn chunk(text: &str) -> Result<Bytes, TransportError> {
    Ok(Bytes::copy_from_slice(text.as_bytes()))
}
