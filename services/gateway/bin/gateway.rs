//! Main Entrypoint for the Kit Gateway Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Constructing the collaborator clients (credentials, audio, agent).
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use kit_gateway::{config::Config, router::create_router, state::AppState};
use kit_gateway_core::{
    agent::HttpAgentClient, audio::FsAudioStore, credentials::StaticKeyVerifier,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Collaborators ---
    let verifier = StaticKeyVerifier::new(config.api_keys.clone());
    if verifier.is_empty() {
        warn!("API_KEYS is empty; every authentication attempt will be rejected");
    }

    let audio_store = FsAudioStore::new(&config.upload_dir)
        .await
        .context("Failed to initialize audio store")?;
    let agent = HttpAgentClient::new(config.agent_url.clone());

    let app_state = Arc::new(AppState {
        verifier: Arc::new(verifier),
        audio_store: Arc::new(audio_store),
        agent: Arc::new(agent),
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        bind_address = %config.bind_address,
        agent_url = %config.agent_url,
        upload_dir = %config.upload_dir.display(),
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
