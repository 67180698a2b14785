//! picturegate - profile picture gateway
//!
//! Serves `/pictures/{userId}` uploads, downloads and deletions on top of an
//! object storage bucket.

mod config;
mod router;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Overrides, StorageConfig};

#[derive(Parser, Debug)]
#[command(name = "picturegate")]
#[command(about = "HTTP gateway for profile pictures kept in object storage", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./picturegate.toml when present)
    #[arg(short, long, env = "PICTUREGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PICTUREGATE_PORT")]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "PICTUREGATE_HOST")]
    host: Option<String>,

    /// Public base URL used in Location headers
    #[arg(long, env = "PICTUREGATE_PUBLIC_URL")]
    public_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "PICTUREGATE_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "picturegate={level},picturegate_pictures={level},tower_http=debug",
                    level = args.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    config.apply(Overrides {
        host: args.host,
        port: args.port,
        public_url: args.public_url,
    });

    info!("Starting picturegate...");
    info!(
        "  Storage: {}",
        match &config.storage {
            StorageConfig::Ephemeral => "ephemeral",
            StorageConfig::S3(_) => "s3",
        }
    );
    info!(
        "  Public URL: {}",
        config.server.public_url.as_deref().unwrap_or("(from request)")
    );

    let state = router::build_state(&config).await;
    let app = router::create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("picturegate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
