//! # creatorhub-core
//!
//! Core crate for the CreatorHub real-time relay. Contains configuration
//! schemas, typed identifiers, the traits through which the relay talks
//! to its external collaborators, and the unified error system.
//!
//! This crate has **no** internal dependencies on other CreatorHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
