//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use huddle_shared::time::SystemClock;

use crate::{
    handler::{debug_room_state, health_check, submit_message, websocket_handler},
    hub::Hub,
    signal::shutdown_signal,
    state::AppState,
};

/// Build the application router over the given state.
///
/// Exposed separately from [`run_server`] so tests can bind an ephemeral
/// port and drive the full HTTP/WebSocket surface.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/messages", post(submit_message))
        .route("/api/health", get(health_check))
        .route("/debug/room", get(debug_room_state))
        .with_state(state)
        // The browser frontend is served from another origin.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the WebSocket chat server
///
/// # Arguments
///
/// * `host` - The host address to bind to (e.g., "127.0.0.1")
/// * `port` - The port number to bind to (e.g., 8080)
pub async fn run_server(host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState {
        hub: Hub::new(Arc::new(SystemClock)),
    });

    let app = router(state);

    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!(
        "WebSocket chat server listening on {}",
        listener.local_addr()?
    );
    tracing::info!("Connect to: ws://{}/ws", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown gracefully");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
