//! Media Gallery
//!
//! A terminal client for a personal media library stored with a hosted
//! auth and object storage backend.

mod app;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't interleave with the shell
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Media Gallery v{}", env!("CARGO_PKG_VERSION"));

    let app = app::App::new().await?;
    app.run().await
}
