use std::time::Duration;

use pollen::model::ImageFeedEvent;
use pollen::options::TransportOptions;
use pollen::services::ImageService;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let images = ImageService::new(&TransportOptions::default())?;

    let subscription = images.subscribe_to_feed(
        |event: ImageFeedEvent| {
            println!("[{}] {}x{} {}", event.model, event.width, event.height, event.prompt);
        },
        Some(Box::new(|err| eprintln!("feed: {}", err))),
    );

    println!("Following the image feed for 15 seconds...");
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(15)) => {}
        _ = subscription.closed() => println!("Feed closed: {:?}", subscription.state()),
    }
    subscription.cancel();

    Ok(())
}
