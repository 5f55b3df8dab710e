use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crestline_api::geo::CommunityCatalog;
use crestline_api::{AppState, Config, build_router, utils};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!(
        "Starting Crestline API v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = %config.port,
        mls = %config.mls_base_url,
        crm = %config.crm_base_url,
        "Configuration loaded"
    );

    // Load the community catalog (configured file, or the embedded one)
    let catalog = match &config.community_catalog_path {
        Some(path) => CommunityCatalog::from_file(path),
        None => CommunityCatalog::embedded(),
    }
    .map_err(|e| {
        error!("Failed to load community catalog: {e}");
        exitcode::CONFIG
    })?;
    info!(communities = catalog.len(), "Community catalog loaded");

    // Build application state and router
    let state = AppState::new(config.clone(), catalog).map_err(|e| {
        error!("Failed to build application state: {e}");
        exitcode::CONFIG
    })?;
    let app = build_router(state.clone());

    // Start server
    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /health                          - Health check");
    info!("  GET  /ready                           - Readiness check");
    info!("  POST /api/listings/search             - Filtered listing search");
    info!("  POST /api/search/nlp                  - Natural-language search");
    info!("  POST /api/leads                       - Lead submission");
    info!("  GET  /api/communities                 - Community catalog");
    info!("  GET  /api/communities/{{slug}}/nearby   - Nearby communities");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(utils::shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    // Gracefully shutdown background tasks
    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}
