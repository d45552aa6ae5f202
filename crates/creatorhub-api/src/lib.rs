//! # creatorhub-api
//!
//! HTTP layer for the CreatorHub relay built on Axum.
//!
//! Owns the sockets: upgrades `/ws`, runs the authentication handshake
//! and the per-connection session loop, and feeds decoded frames to the
//! relay engine. Also serves `/api/health` and the producer intake at
//! `/api/notifications`.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server, serve};
pub use error::ApiError;
pub use state::AppState;
