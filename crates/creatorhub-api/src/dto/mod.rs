//! Data transfer objects for the HTTP endpoints.

pub mod response;
