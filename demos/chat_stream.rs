use std::io::Write;

use futures::StreamExt;
use pollen::model::{StreamEvent, TextGenerationPostParams, TextMessage};
use pollen::options::TransportOptions;
use pollen::services::TextService;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let text = TextService::new(&TransportOptions::default())?;

    let params = TextGenerationPostParams {
        messages: vec![
            TextMessage::system("You are a concise assistant."),
            TextMessage::user("Explain Server-Sent Events in three sentences."),
        ],
        model: Some("openai".to_string()),
        ..Default::default()
    };

    let mut stream = text
        .post_generate_stream(
            &params,
            Some(Box::new(|event: &StreamEvent| {
                if let Some(reason) = event.finish_reason() {
                    tracing::debug!(reason, "completion finished");
                }
            })),
        )
        .await?;

    while let Some(event) = stream.next().await {
        print!("{}", event?.content().unwrap_or_default());
        std::io::stdout().flush()?;
    }
    println!();

    Ok(())
}
