//! Application state shared across all handlers.

use std::sync::Arc;
use std::time::Instant;

use creatorhub_core::config::AppConfig;
use creatorhub_core::traits::CredentialVerifier;
use creatorhub_realtime::RealtimeEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Relay engine
    pub engine: Arc<RealtimeEngine>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Builds the relay engine around the given credential verifier.
    pub fn new(config: AppConfig, verifier: Arc<dyn CredentialVerifier>) -> Self {
        let engine = RealtimeEngine::builder(config.realtime.clone(), verifier).build();
        Self::with_engine(config, engine)
    }

    /// Wraps an engine that was assembled elsewhere (custom graph or archive).
    pub fn with_engine(config: AppConfig, engine: RealtimeEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            started_at: Instant::now(),
        }
    }
}
