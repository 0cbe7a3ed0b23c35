// classify-cache - Bounded TTL/LRU response cache in front of an LLM book-query classifier
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use classify_cache::cache::ResponseCache;
use classify_cache::classifier::{load_taxonomy, LlmClassifier};
use classify_cache::cli::Args;
use classify_cache::config::AppConfig;
use classify_cache::server::{create_router, AppState};
use classify_cache::utils::logging;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration, CLI flags win
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.debug |= args.debug;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting classify-cache v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the response cache; the only instance in the process
    let cache: ResponseCache = ResponseCache::new(config.cache.cache_config())?;

    // Phase 4: Classifier and default taxonomy
    let classifier = LlmClassifier::new(&config.classifier)?;
    info!("Classifier model: {}", classifier.model());
    let taxonomy = load_taxonomy(&config.classifier.taxonomy_path)?;

    // Phase 5: Build and start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState {
        config: Arc::new(config),
        cache: Arc::new(cache),
        classifier: Arc::new(classifier),
        taxonomy: Arc::new(taxonomy),
    };
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
