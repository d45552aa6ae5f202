//! Core type definitions used across the CreatorHub workspace.

pub mod id;

pub use id::*;
