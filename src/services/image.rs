//! Image generation service.
//!
//! See: <https://github.com/pollinations/pollinations/blob/master/APIDOCS.md>

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;
use url::Url;

use super::{parse_json, DEFAULT_IMAGE_BASE_URL, MODELS_PATH};
use crate::builders::ImageRequestBuilder;
use crate::client::ClientError;
use crate::feed::{self, ErrorCallback, FeedSubscription};
use crate::http::{HttpClient, ReqwestHttpClient};
use crate::model::{ImageFeedEvent, ImageGenerationParams};
use crate::options::TransportOptions;

/// Client of the image API.
#[derive(Clone)]
pub struct ImageService {
    base_url: Url,
    http: Arc<dyn HttpClient>,
}

impl ImageService {
    /// Create a service talking to the public image API, or to
    /// `options.base_url` when set.
    pub fn new(options: &TransportOptions) -> Result<Self, ClientError> {
        let http = ReqwestHttpClient::new(DEFAULT_IMAGE_BASE_URL, options)?;
        Ok(Self::from_parts(http.base_url().clone(), Arc::new(http)))
    }

    /// Create a service over a custom transport.
    pub fn from_parts(base_url: Url, http: Arc<dyn HttpClient>) -> Self {
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Generate an image and return its encoded bytes.
    pub async fn generate(
        &self,
        prompt: &str,
        params: &ImageGenerationParams,
    ) -> Result<Bytes, ClientError> {
        let url = ImageRequestBuilder::new(prompt)
            .with_params(params)
            .build(&self.base_url)?;
        debug!(%url, "generating image");
        self.http.get(url.as_str()).await
    }

    /// Names of the available image models.
    pub async fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let body = self.http.get(MODELS_PATH).await?;
        parse_json(&body)
    }

    /// Follow the public feed of image generations.
    pub fn subscribe_to_feed<F>(&self, on_data: F, on_error: Option<ErrorCallback>) -> FeedSubscription
    where
        F: FnMut(ImageFeedEvent) + Send + 'static,
    {
        feed::subscribe_to_feed(self.http.clone(), on_data, on_error)
    }
}

impl std::fmt::Debug for ImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageService")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
