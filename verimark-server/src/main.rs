//! Verimark Server - REST API for watermarking, steganography and content proofs
//!
//! Exposes verimark-core functionality via HTTP endpoints:
//! - POST /watermark/embed, /watermark/extract
//! - POST /steganography/embed, /steganography/extract
//! - POST /proof
//! - POST /sessions, /sessions/{id}/records; GET /sessions/{id}/records[/export]

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;
use verimark_server::{create_router_with_config, Config};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
    tracing::info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("verimark_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();
    let addr = config.socket_addr();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        %addr,
        body_limit_mb = config.body_limit_mb,
        max_file_size_mb = config.max_file_size_mb,
        timeout_secs = config.timeout_secs,
        ledger_start_block = config.ledger_start_block,
        "Starting Verimark API server"
    );

    let app = create_router_with_config(&config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr} (docs at /docs)");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}
