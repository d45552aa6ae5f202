//! # creatorhub-auth
//!
//! Credential verification for the relay's authentication gate.
//!
//! ## Modules
//!
//! - `jwt`: JWT token creation and validation
//! - `verifier`: [`CredentialVerifier`](creatorhub_core::traits::CredentialVerifier)
//!   implementations backed by JWTs or a fixed token table

pub mod jwt;
pub mod verifier;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use verifier::{JwtCredentialVerifier, StaticCredentialVerifier, verifier_from_config};
