//! Credential verifiers used by the relay's authentication gate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use creatorhub_core::AppError;
use creatorhub_core::AppResult;
use creatorhub_core::config::AuthConfig;
use creatorhub_core::traits::{CredentialVerifier, VerifiedIdentity};
use creatorhub_core::types::id::UserId;

use crate::jwt::JwtDecoder;

/// Verifies credentials as HS256 JWT access tokens.
#[derive(Debug, Clone)]
pub struct JwtCredentialVerifier {
    decoder: JwtDecoder,
}

impl JwtCredentialVerifier {
    /// Creates a verifier from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            decoder: JwtDecoder::new(config),
        }
    }
}

#[async_trait]
impl CredentialVerifier for JwtCredentialVerifier {
    async fn verify(&self, credential: &str) -> AppResult<VerifiedIdentity> {
        let claims = self.decoder.decode_access_token(credential)?;
        debug!(user_id = %claims.sub, jti = %claims.jti, "JWT credential accepted");
        Ok(VerifiedIdentity {
            user_id: claims.sub,
            display_name: claims.username,
        })
    }
}

/// Verifies credentials against a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialVerifier {
    tokens: HashMap<String, UserId>,
}

impl StaticCredentialVerifier {
    /// Creates an empty verifier that rejects everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token for a user.
    pub fn with_token(mut self, token: impl Into<String>, user_id: UserId) -> Self {
        self.tokens.insert(token.into(), user_id);
        self
    }

    /// Builds a verifier from a token → user id string table.
    pub fn from_table(table: &HashMap<String, String>) -> AppResult<Self> {
        let mut tokens = HashMap::with_capacity(table.len());
        for (token, user) in table {
            let user_id: UserId = user.parse().map_err(|e| {
                AppError::with_source(
                    creatorhub_core::ErrorKind::Configuration,
                    format!("Static token maps to invalid user id '{user}'"),
                    e,
                )
            })?;
            tokens.insert(token.clone(), user_id);
        }
        Ok(Self { tokens })
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn verify(&self, credential: &str) -> AppResult<VerifiedIdentity> {
        self.tokens
            .get(credential)
            .map(|user_id| VerifiedIdentity {
                user_id: *user_id,
                display_name: None,
            })
            .ok_or_else(|| AppError::authentication("Unknown token"))
    }
}

/// Select the verifier the configuration asks for: the static table when
/// it is non-empty, JWT otherwise.
pub fn verifier_from_config(config: &AuthConfig) -> AppResult<Arc<dyn CredentialVerifier>> {
    if config.static_tokens.is_empty() {
        Ok(Arc::new(JwtCredentialVerifier::new(config)))
    } else {
        tracing::warn!(
            count = config.static_tokens.len(),
            "Using static credential table; do not enable in production"
        );
        Ok(Arc::new(StaticCredentialVerifier::from_table(
            &config.static_tokens,
        )?))
    }
}
