//! Identity collaborator: turns a bearer credential into a user.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::id::UserId;

/// The identity a credential resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Authenticated user.
    pub user_id: UserId,
    /// Display name, if the credential carries one.
    pub display_name: Option<String>,
}

/// Validates bearer credentials presented on a fresh connection.
///
/// Implementations return an `Authentication` error for invalid,
/// expired, or revoked credentials. Any other error kind is treated as a
/// collaborator failure and is also surfaced to the client as an
/// authentication rejection.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + std::fmt::Debug + 'static {
    /// Verify a credential.
    async fn verify(&self, credential: &str) -> AppResult<VerifiedIdentity>;
}
