//! Application builder: wires router, middleware, and state into an Axum app
//! and runs it until a shutdown signal.

use std::future::Future;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use creatorhub_core::config::AppConfig;
use creatorhub_core::{AppError, AppResult, ErrorKind};

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Serves the relay on an already-bound listener until `shutdown` resolves,
/// then shuts the engine down and drains open connections.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let engine = state.engine.clone();
    engine.start();

    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "Relay listening");
    }

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            engine.shutdown().await;
        })
        .await
        .map_err(AppError::from)
}

/// Runs the relay server with the given configuration until Ctrl-C.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    info!("Starting CreatorHub relay v{}", env!("CARGO_PKG_VERSION"));

    let verifier = creatorhub_auth::verifier_from_config(&config.auth)?;
    let addr = config.server.bind_address();
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        AppError::with_source(ErrorKind::Transport, format!("Failed to bind {addr}"), e)
    })?;

    let state = AppState::new(config, verifier);
    let stop = CancellationToken::new();
    let mut server = tokio::spawn(serve(listener, state, stop.clone().cancelled_owned()));

    tokio::select! {
        result = &mut server => return flatten(result),
        () = shutdown_signal() => info!("Shutdown signal received"),
    }

    stop.cancel();
    match tokio::time::timeout(grace, server).await {
        Ok(result) => flatten(result),
        Err(_) => {
            warn!(grace_seconds = grace.as_secs(), "Graceful shutdown timed out");
            Ok(())
        }
    }
}

fn flatten(result: Result<AppResult<()>, tokio::task::JoinError>) -> AppResult<()> {
    result.map_err(|e| AppError::with_source(ErrorKind::Internal, "Server task failed", e))?
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; shutting down");
    }
}
