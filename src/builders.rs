//! Request builders: turn parameters into request URLs and JSON bodies.

pub mod image;
pub mod speech;
pub mod text;

pub use image::ImageRequestBuilder;
pub use speech::{OpenAiSpeechToTextBuilder, OpenAiTextToSpeechBuilder, PollinationsSpeechBuilder};
pub use text::{TextGetRequestBuilder, TextPostRequestBuilder, VisionRequestBuilder};

use url::Url;

use crate::client::ClientError;

/// `base` with `segments` appended as percent-encoded path segments.
pub(crate) fn url_with_segments(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| ClientError::Config(format!("cannot append a path to {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Append `pairs` as the query string, leaving the URL untouched when empty.
pub(crate) fn append_query(url: &mut Url, pairs: &[(&str, String)]) {
    if pairs.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in pairs {
        query.append_pair(key, value);
    }
}
