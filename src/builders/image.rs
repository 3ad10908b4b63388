//! Image generation request URLs.

use url::Url;

use super::{append_query, url_with_segments};
use crate::client::ClientError;
use crate::model::ImageGenerationParams;

/// Builds `/prompt/{prompt}?...` image generation URLs.
///
/// # Example
/// ```
/// use pollen::builders::ImageRequestBuilder;
/// use url::Url;
///
/// let base = Url::parse("https://image.pollinations.ai").unwrap();
/// let url = ImageRequestBuilder::new("A calm ocean")
///     .with_model("flux")
///     .with_dimensions(Some(1024), Some(768))
///     .build(&base)
///     .unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://image.pollinations.ai/prompt/A%20calm%20ocean?model=flux&width=1024&height=768"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImageRequestBuilder {
    prompt: String,
    params: ImageGenerationParams,
}

impl ImageRequestBuilder {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            params: ImageGenerationParams::default(),
        }
    }

    /// Start from a full parameter set.
    pub fn with_params(mut self, params: &ImageGenerationParams) -> Self {
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

    /// Set the image size. Missing or zero dimensions are left to the server.
    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.params.width = width.filter(|w| *w > 0);
        self.params.height = height.filter(|h| *h > 0);
        self
    }

    pub fn with_nologo(mut self, nologo: bool) -> Self {
        self.params.nologo = Some(nologo);
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.params.private = Some(private);
        self
    }

    pub fn with_enhance(mut self, enhance: bool) -> Self {
        self.params.enhance = Some(enhance);
        self
    }

    pub fn with_safe(mut self, safe: bool) -> Self {
        self.params.safe = Some(safe);
        self
    }

    pub fn build(&self, base: &Url) -> Result<Url, ClientError> {
        let params = &self.params;
        let mut url = url_with_segments(base, &["prompt", self.prompt.as_str()])?;

        let mut query = Vec::new();
        if let Some(model) = params.model.as_ref().filter(|m| !m.is_empty()) {
            query.push(("model", model.clone()));
        }
        if let Some(seed) = params.seed {
            query.push(("seed", seed.to_string()));
        }
        if let Some(width) = params.width.filter(|w| *w > 0) {
            query.push(("width", width.to_string()));
        }
        if let Some(height) = params.height.filter(|h| *h > 0) {
            query.push(("height", height.to_string()));
        }
        for (key, flag) in [
            ("nologo", params.nologo),
            ("private", params.private),
            ("enhance", params.enhance),
            ("safe", params.safe),
        ] {
            if let Some(flag) = flag {
                query.push((key, flag.to_string()));
            }
        }

        append_query(&mut url, &query);
        Ok(url)
    }
}
