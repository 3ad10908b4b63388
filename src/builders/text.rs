//! Text generation request URLs and bodies.

use itertools::Itertools;
use nonempty::NonEmpty;
use serde::Serialize;
use url::Url;

use super::{append_query, url_with_segments};
use crate::client::ClientError;
use crate::model::{
    TextGenerationGetParams, TextGenerationPostParams, TextGenerationVisionParams, TextMessage,
    VisionMessage,
};

/// Models accepted by the vision endpoint.
pub const VISION_MODELS: [&str; 3] = ["openai", "openai-large", "claude-hybridspace"];

/// Model used by vision requests unless another one is chosen.
pub const DEFAULT_VISION_MODEL: &str = "openai-large";

/// Builds `/prompt/{prompt}?...` text generation URLs.
#[derive(Debug, Clone, Default)]
pub struct TextGetRequestBuilder {
    prompt: String,
    params: TextGenerationGetParams,
}

impl TextGetRequestBuilder {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            params: TextGenerationGetParams::default(),
        }
    }

    pub fn with_params(mut self, params: &TextGenerationGetParams) -> Self {
        self.params = params.clone();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.params.model = Some(model.into());
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.params.seed = Some(seed);
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.params.json_mode = Some(json_mode);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.params.system = Some(system.into());
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.params.private = Some(private);
        self
    }

    pub fn build(&self, base: &Url) -> Result<Url, ClientError> {
        let params = &self.params;
        let mut url = url_with_segments(base, &["prompt", self.prompt.as_str()])?;

        let mut query = Vec::new();
        if let Some(model) = &params.model {
            query.push(("model", model.clone()));
        }
        if let Some(seed) = params.seed {
            query.push(("seed", seed.to_string()));
        }
        if let Some(json_mode) = params.json_mode {
            query.push(("json", json_mode.to_string()));
        }
        if let Some(system) = &params.system {
            query.push(("system", system.clone()));
        }
        if let Some(private) = params.private {
            query.push(("private", private.to_string()));
        }

        append_query(&mut url, &query);
        Ok(url)
    }
}

/// JSON body of a POST text generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPostBody {
    pub messages: NonEmpty<TextMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    pub stream: bool,
}

/// Builds the body of a POST text generation.
#[derive(Debug, Clone, Default)]
pub struct TextPostRequestBuilder {
    messages: Vec<TextMessage>,
    model: Option<String>,
    seed: Option<i64>,
    json_mode: Option<bool>,
    private: Option<bool>,
    stream: bool,
}

impl TextPostRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a full parameter set.
    pub fn from_params(params: &TextGenerationPostParams) -> Self {
        Self {
            messages: params.messages.clone(),
            model: params.model.clone(),
            seed: params.seed,
            json_mode: params.json_mode,
            private: params.private,
            stream: false,
        }
    }

    pub fn add_message(mut self, message: TextMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = Some(json_mode);
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.private = Some(private);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn build(self) -> Result<TextPostBody, ClientError> {
        let messages = NonEmpty::from_vec(self.messages)
            .ok_or_else(|| ClientError::Builder("At least one message is required".to_string()))?;

        Ok(TextPostBody {
            messages,
            model: self.model,
            seed: self.seed,
            json_mode: self.json_mode,
            private: self.private,
            stream: self.stream,
        })
    }
}

/// JSON body of a vision request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionBody {
    pub messages: NonEmpty<VisionMessage>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
}

/// Builds the body of a vision request.
#[derive(Debug, Clone, Default)]
pub struct VisionRequestBuilder {
    messages: Vec<VisionMessage>,
    model: Option<String>,
    seed: Option<i64>,
    json_mode: Option<bool>,
    private: Option<bool>,
}

impl VisionRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: &TextGenerationVisionParams) -> Self {
        Self {
            messages: params.messages.clone(),
            model: params.model.clone(),
            seed: params.seed,
            json_mode: params.json_mode,
            private: params.private,
        }
    }

    pub fn add_message(mut self, message: VisionMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Choose one of [`VISION_MODELS`]; checked by [`build`](Self::build).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = Some(json_mode);
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.private = Some(private);
        self
    }

    pub fn build(self) -> Result<VisionBody, ClientError> {
        let model = self
            .model
            .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string());
        if !VISION_MODELS.contains(&model.as_str()) {
            return Err(ClientError::Builder(format!(
                "Invalid vision model: {}. Valid models are: {}",
                model,
                VISION_MODELS.iter().join(", ")
            )));
        }

        let messages = NonEmpty::from_vec(self.messages).ok_or_else(|| {
            ClientError::Builder("At least one vision message is required".to_string())
        })?;

        Ok(VisionBody {
            messages,
            model,
            seed: self.seed,
            json_mode: self.json_mode,
            private: self.private,
        })
    }
}
