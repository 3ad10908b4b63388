//! HTTP transport used by the services.
//!
//! Services talk to the API through the [`HttpClient`] trait so the transport
//! can be swapped (or scripted in tests). [`ReqwestHttpClient`] is the default
//! implementation.

use std::collections::HashMap;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::client::ClientError;
use crate::options::TransportOptions;

/// Error raised by a byte stream after it has been opened.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Live response body: ordered chunks, ending with `None` or a single error.
/// Dropping it aborts the underlying connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Headers requesting an uncached event-stream response.
pub const EVENT_STREAM_HEADERS: [(&str, &str); 3] = [
    ("Accept", "text/event-stream"),
    ("Cache-Control", "no-cache"),
    ("Connection", "keep-alive"),
];

/// Transport collaborator consumed by the services.
///
/// `target` is either an absolute URL or a path resolved against the
/// client's base URL.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET `target` and buffer the whole body.
    async fn get(&self, target: &str) -> Result<Bytes, ClientError>;

    /// POST `body` as JSON to `target` and buffer the whole body.
    async fn post_json(&self, target: &str, body: &Value) -> Result<Bytes, ClientError>;

    /// GET `target` and hand back the live body.
    async fn get_stream(
        &self,
        target: &str,
        headers: &[(&str, &str)],
    ) -> Result<ByteStream, ClientError>;

    /// POST `body` as JSON to `target` and hand back the live body.
    async fn post_stream(
        &self,
        target: &str,
        body: &Value,
        headers: &[(&str, &str)],
    ) -> Result<ByteStream, ClientError>;
}

/// Build a configured HTTP client from transport options.
///
/// This applies common configuration like timeouts and proxies.
pub fn build_http_client(transport_options: &TransportOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = transport_options.timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = &transport_options.proxy {
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(e) => warn!(proxy = %proxy_url, error = %e, "ignoring invalid proxy"),
        }
    }

    builder.build()
}

/// Add extra headers to a request if specified in transport options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
    base_url: Url,
    extra_headers: Option<HashMap<String, String>>,
}

impl ReqwestHttpClient {
    /// Create a client rooted at `default_base_url`, unless the options
    /// override the base URL.
    pub fn new(default_base_url: &str, options: &TransportOptions) -> Result<Self, ClientError> {
        let base_url = parse_base_url(options.base_url.as_deref().unwrap_or(default_base_url))?;
        let client = build_http_client(options)?;

        Ok(Self {
            client,
            base_url,
            extra_headers: options.extra_headers.clone(),
        })
    }

    /// The URL relative targets are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, target: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(target)
            .map_err(|e| ClientError::Config(format!("invalid request target {}: {}", target, e)))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let response = add_extra_headers(request, &self.extra_headers).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_response(status, &body));
        }

        Ok(response)
    }

    fn into_byte_stream(response: reqwest::Response) -> ByteStream {
        Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(TransportError::from)),
        )
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, target: &str) -> Result<Bytes, ClientError> {
        let url = self.resolve(target)?;
        debug!(%url, "GET");
        let response = self.send(self.client.get(url)).await?;
        Ok(response.bytes().await?)
    }

    async fn post_json(&self, target: &str, body: &Value) -> Result<Bytes, ClientError> {
        let url = self.resolve(target)?;
        debug!(%url, "POST");
        let response = self.send(self.client.post(url).json(body)).await?;
        Ok(response.bytes().await?)
    }

    async fn get_stream(
        &self,
        target: &str,
        headers: &[(&str, &str)],
    ) -> Result<ByteStream, ClientError> {
        let url = self.resolve(target)?;
        debug!(%url, "GET (stream)");
        let request = with_headers(self.client.get(url), headers);
        let response = self.send(request).await?;
        Ok(Self::into_byte_stream(response))
    }

    async fn post_stream(
        &self,
        target: &str,
        body: &Value,
        headers: &[(&str, &str)],
    ) -> Result<ByteStream, ClientError> {
        let url = self.resolve(target)?;
        debug!(%url, "POST (stream)");
        let request = with_headers(self.client.post(url).json(body), headers);
        let response = self.send(request).await?;
        Ok(Self::into_byte_stream(response))
    }
}

/// Parse a base URL, rejecting ones that cannot carry a path.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw)
        .map_err(|e| ClientError::Config(format!("invalid base URL {}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Config(format!("invalid base URL {}", raw)));
    }
    Ok(url)
}

fn with_headers(mut request: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    for (key, value) in headers {
        request = request.header(*key, *value);
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_http_client() {
        let transport_options = TransportOptions::default().with_timeout(Duration::from_secs(30));
        assert!(build_http_client(&transport_options).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let transport_options =
            TransportOptions::default().with_proxy("http://proxy.example.com:8080".to_string());
        assert!(build_http_client(&transport_options).is_ok());
    }

    #[test]
    fn test_base_url_override() {
        let options = TransportOptions::default().with_base_url("http://localhost:9000".into());
        let client = ReqwestHttpClient::new("https://text.pollinations.ai", &options).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:9000/");
        assert_eq!(
            client.resolve("/feed").unwrap().as_str(),
            "http://localhost:9000/feed"
        );
        assert_eq!(
            client.resolve("https://other.example/x").unwrap().as_str(),
            "https://other.example/x"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ReqwestHttpClient::new("not a url", &TransportOptions::default()).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[tokio::test]
    async fn test_get_sends_extra_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .and(header("Referer", "pollen-tests"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"["flux"]"#))
            .mount(&server)
            .await;

        let options = TransportOptions::default()
            .with_header("Referer".into(), "pollen-tests".into());
        let client = ReqwestHttpClient::new(&server.uri(), &options).unwrap();

        let body = client.get("/models").await.unwrap();
        assert_eq!(&body[..], br#"["flux"]"#);
    }

    #[tokio::test]
    async fn test_post_json_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_json(serde_json::json!({"messages": []})))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"message": "no messages"}"#),
            )
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::new(&server.uri(), &TransportOptions::default()).unwrap();
        let err = client
            .post_json("/", &serde_json::json!({"messages": []}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Request failed: no messages");
    }

    #[tokio::test]
    async fn test_get_stream_yields_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .and(header("Accept", "text/event-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: {}\n\n"),
            )
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::new(&server.uri(), &TransportOptions::default()).unwrap();
        let mut stream = client.get_stream("/feed", &EVENT_STREAM_HEADERS).await.unwrap();

        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(body, b"data: {}\n\n");
    }
}
