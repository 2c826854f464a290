use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber;

use granary::config::GranaryConfig;
use granary::grpc::GrpcServer;
use granary::quota::QuotaLimiter;
use granary::store::RedisStore;

#[derive(Parser)]
#[command(name = "granary", about = "Distributed purchase quota service", version)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Granary Purchase Quota Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match args.config {
        Some(path) => GranaryConfig::from_file(&path.to_string_lossy())?,
        None => GranaryConfig::default(),
    };
    config.validate()?;
    info!(
        grpc_addr = %config.server.grpc_addr,
        limit = config.quota.limit,
        window_seconds = config.quota.window_seconds,
        "Configuration loaded"
    );

    // Connect to the shared store
    let store = RedisStore::connect(&config.store.redis_url).await?;

    // Initialize the quota limiter
    let limiter = Arc::new(QuotaLimiter::new(store, config.quota.clone()));
    info!("Quota limiter initialized");

    // Create and start the gRPC server
    let grpc_server = GrpcServer::new(config.server.grpc_addr, limiter);

    info!("Starting gRPC server on {}", config.server.grpc_addr);

    // Run the server with graceful shutdown on Ctrl+C
    grpc_server
        .serve_with_shutdown(shutdown_signal())
        .await?;

    info!("Granary Purchase Quota Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
