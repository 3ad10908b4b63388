//! Speech request URLs and bodies.

use nonempty::NonEmpty;
use serde::Serialize;
use url::Url;

use super::{append_query, url_with_segments};
use crate::client::ClientError;
use crate::model::{SpeechToTextMessage, TextToSpeechMessage, TextToSpeechParams};

/// Model serving every speech call.
pub const SPEECH_MODEL: &str = "openai-audio";
pub const DEFAULT_VOICE: &str = "alloy";
pub const DEFAULT_FORMAT: &str = "wav";

/// Builds `/{text}?voice=...&model=openai-audio` URLs returning raw audio.
#[derive(Debug, Clone, Default)]
pub struct PollinationsSpeechBuilder {
    text: String,
    voice: Option<String>,
}

impl PollinationsSpeechBuilder {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn build(&self, base: &Url) -> Result<Url, ClientError> {
        if self.text.trim().is_empty() {
            return Err(ClientError::Builder("Text is required".to_string()));
        }

        let mut url = url_with_segments(base, &[self.text.as_str()])?;
        let voice = self.voice.as_deref().unwrap_or(DEFAULT_VOICE);
        append_query(
            &mut url,
            &[("voice", voice.to_string()), ("model", SPEECH_MODEL.to_string())],
        );
        Ok(url)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AudioSettings {
    pub voice: String,
    pub format: String,
}

/// JSON body of an OpenAI-compatible text-to-speech call.
#[derive(Debug, Clone, Serialize)]
pub struct TextToSpeechBody {
    pub audio: AudioSettings,
    pub model: String,
    pub modalities: Vec<String>,
    pub messages: NonEmpty<TextToSpeechMessage>,
}

#[derive(Debug, Clone, Default)]
pub struct OpenAiTextToSpeechBuilder {
    messages: Vec<TextToSpeechMessage>,
    params: TextToSpeechParams,
}

impl OpenAiTextToSpeechBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(mut self, message: TextToSpeechMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_params(mut self, params: &TextToSpeechParams) -> Self {
        self.params = params.clone();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.params.voice = Some(voice.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.params.format = Some(format.into());
        self
    }

    pub fn build(self) -> Result<TextToSpeechBody, ClientError> {
        let messages = NonEmpty::from_vec(self.messages)
            .ok_or_else(|| ClientError::Builder("At least one message is required".to_string()))?;

        Ok(TextToSpeechBody {
            audio: AudioSettings {
                voice: self.params.voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
                format: self.params.format.unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            },
            model: SPEECH_MODEL.to_string(),
            modalities: vec!["text".to_string(), "audio".to_string()],
            messages,
        })
    }
}

/// JSON body of an OpenAI-compatible transcription call.
#[derive(Debug, Clone, Serialize)]
pub struct SpeechToTextBody {
    pub model: String,
    pub messages: NonEmpty<SpeechToTextMessage>,
}

#[derive(Debug, Clone, Default)]
pub struct OpenAiSpeechToTextBuilder {
    messages: Vec<SpeechToTextMessage>,
}

impl OpenAiSpeechToTextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(mut self, message: SpeechToTextMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn build(self) -> Result<SpeechToTextBody, ClientError> {
        let messages = NonEmpty::from_vec(self.messages)
            .ok_or_else(|| ClientError::Builder("At least one message is required".to_string()))?;

        Ok(SpeechToTextBody {
            model: SPEECH_MODEL.to_string(),
            messages,
        })
    }
}
