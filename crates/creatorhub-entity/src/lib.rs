//! # creatorhub-entity
//!
//! Value objects handled by the relay. Every struct here derives `Debug`,
//! `Clone`, `Serialize`, and `Deserialize`, and serializes with camelCase
//! field names to match the wire format.

pub mod notification;
pub mod presence;
