//! # pollen - Pollinations API client with a streaming SSE core
//!
//! An async client for the Pollinations image, text and speech APIs, built
//! around a small Server-Sent Events consumer.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Live feeds of public generations with cancellable subscriptions
//! - Streamed chat completions as a bounded, back-pressured `Stream`
//! - Request builders producing URLs and JSON bodies
//! - Swappable HTTP transport behind the [`http::HttpClient`] trait
//!
//! ## Architecture
//!
//! - **[`sse`]**: frame splitter. Turns raw body chunks into `data:` frames,
//!   carrying partial frames across chunk boundaries.
//! - **[`feed`]**: feed dispatcher. Subscribes to `/feed` and pushes every
//!   decoded event to a callback until cancelled.
//! - **[`stream`]**: stream transformer. Turns a completion body into an
//!   [`EventStream`] that ends on the `[DONE]` sentinel.
//! - **[`services`]**: image, text and speech clients on top of the above.
//!
//! ## Example
//! ```no_run
//! use futures::StreamExt;
//! use pollen::model::{TextGenerationPostParams, TextMessage};
//! use pollen::options::TransportOptions;
//! use pollen::services::TextService;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let text = TextService::new(&TransportOptions::default())?;
//!
//!     let params = TextGenerationPostParams {
//!         messages: vec![TextMessage::user("Write a haiku about rivers")],
//!         model: Some("openai".to_string()),
//!         ..Default::default()
//!     };
//!
//!     let mut stream = text.post_generate_stream(&params, None).await?;
//!     while let Some(event) = stream.next().await {
//!         print!("{}", event?.content().unwrap_or_default());
//!     }
//!
//!     // Follow what others are generating until we have seen enough.
//!     let feed = text.subscribe_to_feed(|event| println!("{}", event.response), None);
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     feed.cancel();
//!     Ok(())
//! }
//! ```

pub mod builders;
pub mod client;
pub mod feed;
pub mod http;
pub mod model;
pub mod options;
pub mod services;
pub mod sse;
pub mod stream;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use client::ClientError;
pub use feed::{subscribe_to_feed, FeedSubscription, SubscriptionState};
pub use services::{ImageService, SpeechService, TextService};
pub use stream::{create_event_stream, EventStream};
