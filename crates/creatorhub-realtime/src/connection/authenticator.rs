//! Authentication gate: the credential exchange that precedes every other
//! operation on a connection.

use std::sync::Arc;

use tracing::warn;

use creatorhub_core::traits::{CredentialVerifier, VerifiedIdentity};
use creatorhub_core::{AppError, AppResult, ErrorKind};
use creatorhub_protocol::ClientMessage;
use creatorhub_protocol::serializer::decode_client;
use creatorhub_protocol::validator::validate_frame;

/// Validates the first frame of a connection.
#[derive(Clone)]
pub struct ConnectionAuthenticator {
    /// Identity collaborator.
    verifier: Arc<dyn CredentialVerifier>,
    /// Maximum inbound frame size.
    max_message_size: usize,
}

impl std::fmt::Debug for ConnectionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionAuthenticator")
            .field("verifier", &self.verifier)
            .finish()
    }
}

impl ConnectionAuthenticator {
    /// Creates a new authenticator.
    pub fn new(verifier: Arc<dyn CredentialVerifier>, max_message_size: usize) -> Self {
        Self {
            verifier,
            max_message_size,
        }
    }

    /// Authenticates a connection from its first raw text frame.
    ///
    /// Anything other than a well-formed `authenticate` message is
    /// rejected; no other operation is processed before this succeeds.
    pub async fn authenticate_frame(&self, raw: &str) -> AppResult<VerifiedIdentity> {
        validate_frame(raw, self.max_message_size)
            .map_err(|e| AppError::authentication(e.message))?;
        let msg = decode_client(raw)
            .map_err(|_| AppError::authentication("Expected an authenticate message"))?;
        self.authenticate(&msg).await
    }

    /// Authenticates a decoded message.
    pub async fn authenticate(&self, msg: &ClientMessage) -> AppResult<VerifiedIdentity> {
        let ClientMessage::Authenticate { token } = msg else {
            return Err(AppError::authentication(format!(
                "Authentication required before '{}'",
                msg.event_name()
            )));
        };

        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::authentication("Missing credential"));
        }

        self.verifier.verify(token).await.map_err(|e| {
            if e.kind == ErrorKind::Authentication {
                e
            } else {
                warn!(error = %e, "Credential verifier failed");
                AppError::authentication("Credential verification failed")
            }
        })
    }
}
