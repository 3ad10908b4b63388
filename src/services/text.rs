//! Text generation service.
//!
//! Covers GET and POST generation, vision prompts, streamed chat completions
//! and the public text feed.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::{into_text, parse_json, DEFAULT_TEXT_BASE_URL, MODELS_PATH};
use crate::builders::{TextGetRequestBuilder, TextPostRequestBuilder, VisionRequestBuilder};
use crate::client::ClientError;
use crate::feed::{self, ErrorCallback, FeedSubscription};
use crate::http::{HttpClient, ReqwestHttpClient, EVENT_STREAM_HEADERS};
use crate::model::{
    Model, StreamEvent, TextFeedEvent, TextGenerationGetParams, TextGenerationPostParams,
    TextGenerationVisionParams,
};
use crate::options::TransportOptions;
use crate::stream::{create_event_stream, EventCallback, EventStream};

/// Client of the text API.
#[derive(Clone)]
pub struct TextService {
    base_url: Url,
    http: Arc<dyn HttpClient>,
    stream_capacity: usize,
}

impl TextService {
    pub fn new(options: &TransportOptions) -> Result<Self, ClientError> {
        let http = ReqwestHttpClient::new(DEFAULT_TEXT_BASE_URL, options)?;
        Ok(Self::from_parts(http.base_url().clone(), Arc::new(http))
            .with_stream_capacity(options.stream_capacity))
    }

    pub fn from_parts(base_url: Url, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url,
            http,
            stream_capacity: crate::options::DEFAULT_STREAM_CAPACITY,
        }
    }

    /// Bound the number of decoded events buffered per completion stream.
    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Generate text for a single prompt.
    pub async fn get_generate(
        &self,
        prompt: &str,
        params: &TextGenerationGetParams,
    ) -> Result<String, ClientError> {
        let url = TextGetRequestBuilder::new(prompt)
            .with_params(params)
            .build(&self.base_url)?;
        debug!(%url, "generating text");
        let body = self.http.get(url.as_str()).await?;
        Ok(into_text(body))
    }

    /// Generate with JSON mode forced on and decode the answer as `T`.
    pub async fn get_generate_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        params: &TextGenerationGetParams,
    ) -> Result<T, ClientError> {
        let url = TextGetRequestBuilder::new(prompt)
            .with_params(params)
            .with_json_mode(true)
            .build(&self.base_url)?;
        debug!(%url, "generating json");
        let body = self.http.get(url.as_str()).await?;
        parse_json(&body)
    }

    /// Generate text for a conversation.
    pub async fn post_generate(
        &self,
        params: &TextGenerationPostParams,
    ) -> Result<String, ClientError> {
        let body = TextPostRequestBuilder::from_params(params).build()?;
        let body = serde_json::to_value(&body)?;
        let response = self.http.post_json("/", &body).await?;
        Ok(into_text(response))
    }

    /// Stream a chat completion.
    ///
    /// Fails only when the stream cannot be opened; later failures arrive as
    /// items of the returned stream. `on_stream_data` sees every event pushed
    /// onto it.
    pub async fn post_generate_stream(
        &self,
        params: &TextGenerationPostParams,
        on_stream_data: Option<EventCallback<StreamEvent>>,
    ) -> Result<EventStream<StreamEvent>, ClientError> {
        let body = TextPostRequestBuilder::from_params(params)
            .with_stream(true)
            .build()?;
        let body = serde_json::to_value(&body)?;

        let source = self
            .http
            .post_stream("/", &body, &EVENT_STREAM_HEADERS)
            .await
            .map_err(|e| {
                warn!(error = %e, "failed to open completion stream");
                ClientError::Connect(Box::new(e))
            })?;

        Ok(create_event_stream(source, on_stream_data, self.stream_capacity))
    }

    /// Ask a vision model about text and image parts.
    pub async fn vision(&self, params: &TextGenerationVisionParams) -> Result<String, ClientError> {
        let body = VisionRequestBuilder::from_params(params).build()?;
        let body = serde_json::to_value(&body)?;
        let response = self.http.post_json("/", &body).await?;
        Ok(into_text(response))
    }

    pub async fn list_models(&self) -> Result<Vec<Model>, ClientError> {
        let body = self.http.get(MODELS_PATH).await?;
        parse_json(&body)
    }

    /// Follow the public feed of text generations.
    pub fn subscribe_to_feed<F>(&self, on_data: F, on_error: Option<ErrorCallback>) -> FeedSubscription
    where
        F: FnMut(TextFeedEvent) + Send + 'static,
    {
        feed::subscribe_to_feed(self.http.clone(), on_data, on_error)
    }
}

impl std::fmt::Debug for TextService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextService")
            .field("base_url", &self.base_url.as_str())
            .field("stream_capacity", &self.stream_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageUrl, Role, TextMessage, VisionContent, VisionMessage};
    use crate::testing::{text_chunks, MockHttpClient};
    use futures::StreamExt;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(mock: Arc<MockHttpClient>) -> TextService {
        TextService::from_parts(Url::parse(DEFAULT_TEXT_BASE_URL).unwrap(), mock)
    }

    fn conversation() -> TextGenerationPostParams {
        TextGenerationPostParams {
            messages: vec![TextMessage::user("Hello")],
            model: Some("openai".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_generate() {
        let mock = Arc::new(MockHttpClient::new().with_body("Hi there"));
        let params = TextGenerationGetParams {
            system: Some("Be brief".into()),
            ..Default::default()
        };

        let text = service(mock.clone()).get_generate("Say hi", &params).await.unwrap();

        assert_eq!(text, "Hi there");
        assert_eq!(
            mock.requests()[0].target,
            "https://text.pollinations.ai/prompt/Say%20hi?system=Be+brief"
        );
    }

    #[tokio::test]
    async fn test_get_generate_json_forces_json_mode() {
        let mock = Arc::new(MockHttpClient::new().with_body(r#"{"answer":42}"#));

        let value: Value = service(mock.clone())
            .get_generate_json("Answer", &TextGenerationGetParams::default())
            .await
            .unwrap();

        assert_eq!(value, json!({"answer": 42}));
        assert!(mock.requests()[0].target.ends_with("?json=true"));
    }

    #[tokio::test]
    async fn test_get_generate_json_rejects_non_json() {
        let mock = Arc::new(MockHttpClient::new().with_body("not json"));
        let err = service(mock)
            .get_generate_json::<Value>("Answer", &TextGenerationGetParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
    }

    #[tokio::test]
    async fn test_post_generate_body() {
        let mock = Arc::new(MockHttpClient::new().with_body("Hello back"));

        let text = service(mock.clone()).post_generate(&conversation()).await.unwrap();

        assert_eq!(text, "Hello back");
        let request = &mock.requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.target, "/");
        assert_eq!(
            request.body,
            Some(json!({
                "messages": [{"role": "user", "content": "Hello"}],
                "model": "openai",
                "stream": false
            }))
        );
    }

    #[tokio::test]
    async fn test_post_generate_requires_messages() {
        let mock = Arc::new(MockHttpClient::new());
        let err = service(mock.clone())
            .post_generate(&TextGenerationPostParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Builder(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_post_generate_stream() {
        let mock = Arc::new(MockHttpClient::new().with_stream(text_chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
        ])));
        let seen = Arc::new(Mutex::new(String::new()));
        let sink = seen.clone();
        let on_data: EventCallback<StreamEvent> = Box::new(move |event| {
            sink.lock().push_str(event.content().unwrap_or_default());
        });

        let stream = service(mock.clone())
            .post_generate_stream(&conversation(), Some(on_data))
            .await
            .unwrap();
        let text: String = stream
            .map(|event| event.unwrap().content().unwrap_or_default().to_string())
            .collect::<Vec<_>>()
            .await
            .concat();

        assert_eq!(text, "Hello");
        assert_eq!(*seen.lock(), "Hello");

        let request = &mock.requests()[0];
        assert_eq!(request.body.as_ref().unwrap()["stream"], json!(true));
        assert!(request
            .headers
            .contains(&("Accept".to_string(), "text/event-stream".to_string())));
    }

    #[tokio::test]
    async fn test_post_generate_stream_connect_failure() {
        let mock = Arc::new(
            MockHttpClient::new().with_stream_error(ClientError::Request("HTTP 503".into())),
        );
        let err = service(mock)
            .post_generate_stream(&conversation(), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to open event stream: Request failed: HTTP 503"
        );
    }

    #[tokio::test]
    async fn test_vision_body() {
        let mock = Arc::new(MockHttpClient::new().with_body("A cat"));
        let params = TextGenerationVisionParams {
            messages: vec![VisionMessage {
                role: Role::User,
                content: vec![
                    VisionContent::Text {
                        text: "What is this?".into(),
                    },
                    VisionContent::ImageUrl {
                        image_url: ImageUrl {
                            url: "https://example.com/cat.png".into(),
                        },
                    },
                ],
            }],
            ..Default::default()
        };

        let answer = service(mock.clone()).vision(&params).await.unwrap();

        assert_eq!(answer, "A cat");
        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["model"], json!("openai-large"));
        assert_eq!(body["messages"][0]["content"][1]["type"], json!("image_url"));
    }

    #[tokio::test]
    async fn test_vision_rejects_invalid_model() {
        let mock = Arc::new(MockHttpClient::new());
        let params = TextGenerationVisionParams {
            model: Some("llama".into()),
            ..Default::default()
        };
        let err = service(mock).vision(&params).await.unwrap_err();
        assert!(err.to_string().contains("Invalid vision model: llama"));
    }

    #[tokio::test]
    async fn test_list_models() {
        let mock = Arc::new(MockHttpClient::new().with_body(
            r#"[{"name":"openai","type":"chat","censored":true,"description":"GPT","baseModel":true,"vision":true}]"#,
        ));
        let models = service(mock).list_models().await.unwrap();

        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "openai");
        assert_eq!(models[0].vision, Some(true));
    }

    #[tokio::test]
    async fn test_text_feed() {
        let mock = Arc::new(MockHttpClient::new().with_stream(text_chunks(&[
            "data: {\"response\":\"Hi\",\"parameters\":{\"model\":\"openai\"}}\n\n",
        ])));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let subscription = service(mock).subscribe_to_feed(
            move |event: TextFeedEvent| {
                let _ = tx.send(event);
            },
            None,
        );
        subscription.closed().await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.response, "Hi");
        assert_eq!(event.parameters.model, "openai");
    }

    #[tokio::test]
    async fn test_stream_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("accept", "text/event-stream"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(
                        "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n",
                    ),
            )
            .mount(&server)
            .await;

        let options = TransportOptions::default()
            .with_base_url(server.uri())
            .with_stream_capacity(2);
        let service = TextService::new(&options).unwrap();

        let events: Vec<_> = service
            .post_generate_stream(&conversation(), None)
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().content(), Some("ok"));
    }

    #[tokio::test]
    async fn test_api_error_message_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Bad prompt"})))
            .mount(&server)
            .await;

        let options = TransportOptions::default().with_base_url(server.uri());
        let err = TextService::new(&options)
            .unwrap()
            .get_generate("x", &TextGenerationGetParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Request failed: Bad prompt");
    }
}
