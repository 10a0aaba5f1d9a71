// Vigil - AI surveillance streaming server

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vigil_server::{build_state, create_router, load_config, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .init();

    info!("Starting Vigil surveillance server...");

    let config = load_config(&cli).context("Failed to load configuration")?;

    info!("Initializing detection channels...");
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = build_state(&config).with_shutdown(shutdown_rx);
    if state.processors.is_empty() {
        info!("No channel could be loaded; serving alerts and status only");
    }

    let app = create_router(state, &config.server);

    let host = config.server.host.as_str();
    let port = config.server.port;
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))?;

    info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown().await;
            // Streams never end on their own; tell them to stop
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
