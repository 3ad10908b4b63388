//! Speech synthesis and transcription service.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;
use url::Url;

use super::{parse_json, DEFAULT_TEXT_BASE_URL};
use crate::builders::{OpenAiSpeechToTextBuilder, OpenAiTextToSpeechBuilder, PollinationsSpeechBuilder};
use crate::client::ClientError;
use crate::http::{HttpClient, ReqwestHttpClient};
use crate::model::{OpenAiSpeechResponse, SpeechToTextMessage, TextToSpeechMessage, TextToSpeechParams};
use crate::options::TransportOptions;

const OPENAI_PATH: &str = "/openai";

/// Client of the speech endpoints, served by the text API.
#[derive(Clone)]
pub struct SpeechService {
    base_url: Url,
    http: Arc<dyn HttpClient>,
}

impl SpeechService {
    pub fn new(options: &TransportOptions) -> Result<Self, ClientError> {
        let http = ReqwestHttpClient::new(DEFAULT_TEXT_BASE_URL, options)?;
        Ok(Self::from_parts(http.base_url().clone(), Arc::new(http)))
    }

    pub fn from_parts(base_url: Url, http: Arc<dyn HttpClient>) -> Self {
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Speak `messages` through the OpenAI-compatible endpoint. The audio
    /// comes back base64 encoded, see [`OpenAiSpeechResponse::audio_data`].
    pub async fn openai_text_to_speech(
        &self,
        messages: Vec<TextToSpeechMessage>,
        params: &TextToSpeechParams,
    ) -> Result<OpenAiSpeechResponse, ClientError> {
        let body = messages
            .into_iter()
            .fold(OpenAiTextToSpeechBuilder::new(), |builder, message| {
                builder.add_message(message)
            })
            .with_params(params)
            .build()?;
        let body = serde_json::to_value(&body)?;

        debug!("requesting speech synthesis");
        let response = self.http.post_json(OPENAI_PATH, &body).await?;
        parse_json(&response)
    }

    /// Speak `text` and return the raw audio bytes.
    pub async fn pollinations_text_to_speech(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> Result<Bytes, ClientError> {
        let mut builder = PollinationsSpeechBuilder::new(text);
        if let Some(voice) = voice {
            builder = builder.with_voice(voice);
        }
        let url = builder.build(&self.base_url)?;
        debug!(%url, "requesting speech audio");
        self.http.get(url.as_str()).await
    }

    /// Transcribe audio carried in `messages`.
    pub async fn openai_speech_to_text(
        &self,
        messages: Vec<SpeechToTextMessage>,
    ) -> Result<OpenAiSpeechResponse, ClientError> {
        let body = messages
            .into_iter()
            .fold(OpenAiSpeechToTextBuilder::new(), |builder, message| {
                builder.add_message(message)
            })
            .build()?;
        let body = serde_json::to_value(&body)?;

        debug!("requesting transcription");
        let response = self.http.post_json(OPENAI_PATH, &body).await?;
        parse_json(&response)
    }
}

impl std::fmt::Debug for SpeechService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechService")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
