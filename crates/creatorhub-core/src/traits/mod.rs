//! Collaborator traits defined in `creatorhub-core` and implemented by
//! other crates (or by the host application).

pub mod identity;
pub mod relationship;

pub use identity::{CredentialVerifier, VerifiedIdentity};
pub use relationship::{Audience, RelationshipGraph};
