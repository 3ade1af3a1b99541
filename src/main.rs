//! Provider binary: sets up logging and serves the Buddy provider.

use hemmer_provider_buddy::{init_logging, serve, BuddyProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Buddy provider");
    serve(BuddyProvider::new()).await
}
