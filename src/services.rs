//! Service clients for the image, text and speech APIs.

pub mod image;
pub mod speech;
pub mod text;

// Re-export for convenience
pub use image::ImageService;
pub use speech::SpeechService;
pub use text::TextService;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::client::ClientError;

pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.pollinations.ai";
pub const DEFAULT_TEXT_BASE_URL: &str = "https://text.pollinations.ai";

const MODELS_PATH: &str = "/models";

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ClientError> {
    Ok(serde_json::from_slice(body)?)
}

fn into_text(body: Bytes) -> String {
    String::from_utf8_lossy(&body).into_owned()
}
