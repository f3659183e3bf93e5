//! Application builder: wires router, middleware and state into an Axum app
//! and serves it.

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use quill_core::error::AppError;
use quill_core::result::AppResult;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server);
    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Binds the configured address and serves until Ctrl+C.
pub async fn run_server(state: AppState) -> AppResult<()> {
    let addr = state.config.server.bind_address();
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    info!("Quill server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("Quill server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
