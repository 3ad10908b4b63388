//! Request parameters and response types of the generation API.
//!
//! Response types are deliberately lenient (`#[serde(default)]`): the feed and
//! completion payloads are only required to be valid JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of the message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A plain text chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextMessage {
    pub role: Role,
    pub content: String,
}

impl TextMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// A chat message mixing text and image parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisionMessage {
    pub role: Role,
    pub content: Vec<VisionContent>,
}

/// One part of a [`VisionMessage`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisionContent {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

// --- Request parameters ---

/// Image generation parameters. Unset fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageGenerationParams {
    pub model: Option<String>,
    pub seed: Option<i64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub nologo: Option<bool>,
    pub private: Option<bool>,
    pub enhance: Option<bool>,
    pub safe: Option<bool>,
}

/// Parameters of a GET text generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextGenerationGetParams {
    pub model: Option<String>,
    pub seed: Option<i64>,
    pub json_mode: Option<bool>,
    pub system: Option<String>,
    pub private: Option<bool>,
}

/// Parameters of a POST text generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextGenerationPostParams {
    pub messages: Vec<TextMessage>,
    pub model: Option<String>,
    pub seed: Option<i64>,
    pub json_mode: Option<bool>,
    pub private: Option<bool>,
}

/// Parameters of a vision request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextGenerationVisionParams {
    pub messages: Vec<VisionMessage>,
    pub model: Option<String>,
    pub seed: Option<i64>,
    pub json_mode: Option<bool>,
    pub private: Option<bool>,
}

/// Voice settings shared by the text-to-speech calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextToSpeechParams {
    pub voice: Option<String>,
    pub format: Option<String>,
}

// --- Models ---

/// A text model advertised by `/models`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Model {
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub censored: bool,
    pub description: String,
    /// Reported as a string by some deployments and a flag by others.
    pub base_model: Option<Value>,
    pub vision: Option<bool>,
    pub reasoning: Option<bool>,
    pub provider: Option<String>,
    pub audio: Option<bool>,
    pub voices: Option<Vec<String>>,
}

// --- Feed events ---

/// An image generation seen on the public image feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageFeedEvent {
    pub width: u32,
    pub height: u32,
    pub seed: i64,
    pub model: String,
    pub nologo: bool,
    pub negative_prompt: String,
    pub nofeed: bool,
    pub safe: bool,
    pub prompt: String,
    pub ip: Option<String>,
    pub status: String,
    #[serde(rename = "concurrentRequests")]
    pub concurrent_requests: u32,
    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,
    #[serde(rename = "isChild")]
    pub is_child: Option<bool>,
    pub maturity: Option<Maturity>,
    #[serde(rename = "timingInfo")]
    pub timing_info: Vec<TimingInfo>,
    pub referrer: Option<String>,
    #[serde(rename = "wasPimped")]
    pub was_pimped: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Maturity {
    #[serde(rename = "isChild", default)]
    pub is_child: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimingInfo {
    pub step: String,
    pub timestamp: u64,
}

/// A text generation seen on the public text feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextFeedEvent {
    pub response: String,
    pub parameters: TextFeedParams,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextFeedParams {
    /// Text or vision messages, exactly as submitted.
    pub messages: Vec<Value>,
    #[serde(rename = "jsonMode")]
    pub json_mode: bool,
    pub seed: Option<i64>,
    pub model: String,
    pub temperature: Option<f64>,
    #[serde(rename = "isImagePollinationsReferrer")]
    pub is_image_pollinations_referrer: bool,
    #[serde(rename = "isRobloxReferrer")]
    pub is_roblox_referrer: bool,
    pub referrer: Option<String>,
    pub stream: bool,
    #[serde(rename = "isPrivate")]
    pub is_private: bool,
    pub voice: Option<String>,
    pub prompt_tokens: Option<u32>,
    pub prompt_tokens_details: Option<TokensDetail>,
    pub completion_tokens: Option<u32>,
    pub completion_tokens_details: Option<TokensDetail>,
    pub total_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TokensDetail {
    pub accepted_prediction_tokens: Option<u32>,
    pub audio_tokens: Option<u32>,
    pub cached_tokens: Option<u32>,
    pub reasoning_tokens: Option<u32>,
    pub rejected_prediction_tokens: Option<u32>,
}

// --- Chat completion stream ---

/// One chunk of a streamed chat completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamEvent {
    pub id: Option<String>,
    pub object: Option<String>,
    pub created: Option<u64>,
    pub model: Option<String>,
    pub choices: Vec<StreamChoice>,
    pub usage: Option<Usage>,
}

impl StreamEvent {
    /// Text carried by the first choice's delta, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamChoice {
    pub index: u32,
    pub delta: StreamDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamDelta {
    pub role: Option<Role>,
    pub content: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub prompt_tokens_details: Option<TokensDetail>,
    pub completion_tokens: Option<u32>,
    pub completion_tokens_details: Option<TokensDetail>,
    pub total_tokens: Option<u32>,
}

// --- Speech ---

/// Role of a text-to-speech message; `input_audio` marks spoken input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpeechRole {
    System,
    User,
    Assistant,
    InputAudio,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextToSpeechMessage {
    pub role: SpeechRole,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechToTextMessage {
    pub role: Role,
    pub content: Vec<SpeechToTextContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeechToTextContent {
    Text { text: String },
    InputAudio { input_audio: InputAudio },
}

/// Base64 encoded audio clip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputAudio {
    pub data: String,
    pub format: String,
}

/// OpenAI-compatible response of the speech endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiSpeechResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub system_fingerprint: Option<String>,
    pub choices: Vec<SpeechChoice>,
    pub usage: Option<Usage>,
}

impl OpenAiSpeechResponse {
    /// Base64 audio of the first choice.
    pub fn audio_data(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.audio.as_ref())
            .map(|audio| audio.data.as_str())
    }

    /// Transcript or text content of the first choice.
    pub fn text(&self) -> Option<&str> {
        let message = &self.choices.first()?.message;
        message
            .content
            .as_deref()
            .or_else(|| message.audio.as_ref().map(|audio| audio.transcript.as_str()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechChoice {
    pub index: u32,
    pub finish_reason: Option<String>,
    pub message: SpeechMessage,
    /// Moderation verdicts, passed through untouched.
    pub content_filter_results: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechMessage {
    pub role: String,
    pub content: Option<String>,
    pub refusal: Option<String>,
    pub audio: Option<SpeechAudio>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechAudio {
    pub id: String,
    pub data: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: u64,
    pub transcript: String,
}
