//! Client error type shared by every service.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::http::TransportError;

/// Errors that can occur during client operations.
///
/// Streaming failures carry a stage prefix in their message so a caller can
/// tell establishment, mid-stream and parse failures apart without inspecting
/// the variant.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A non-streaming request was answered with a non-success status.
    #[error("Request failed: {0}")]
    Request(String),

    /// The event stream could not be opened.
    #[error("Failed to open event stream: {0}")]
    Connect(#[source] Box<ClientError>),

    /// The transport failed after the event stream was opened.
    #[error("Stream error: {0}")]
    Stream(#[source] TransportError),

    /// A feed frame carried a payload that is not valid JSON.
    /// The subscription keeps running.
    #[error("Failed to parse feed event: {0}")]
    FeedEvent(#[source] serde_json::Error),

    /// A chat-completion frame carried a payload that is not valid JSON.
    /// The output stream ends after this error.
    #[error("Failed to parse stream event: {0}")]
    StreamEvent(#[source] serde_json::Error),

    #[error("Invalid request: {0}")]
    Builder(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Build a [`ClientError::Request`] from an unsuccessful response.
    ///
    /// The API reports failures as `{"message": "..."}`; anything else is
    /// passed through with its status.
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ApiErrorResponse>(body) {
            Ok(ApiErrorResponse { message: Some(message) }) if !message.is_empty() => {
                ClientError::Request(message)
            }
            _ if body.trim().is_empty() => ClientError::Request(format!("HTTP {}", status)),
            _ => ClientError::Request(format!("HTTP {}: {}", status, body.trim())),
        }
    }

    /// Whether this error came out of the SSE machinery rather than a plain request.
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            ClientError::Connect(_)
                | ClientError::Stream(_)
                | ClientError::FeedEvent(_)
                | ClientError::StreamEvent(_)
        )
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: Option<String>,
}
