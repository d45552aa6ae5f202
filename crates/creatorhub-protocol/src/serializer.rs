//! JSON encoding and decoding of relay frames.

use creatorhub_core::AppError;
use creatorhub_core::AppResult;

use crate::types::{ClientMessage, ServerMessage};

/// Serialize a server message to a text frame.
pub fn encode_server(msg: &ServerMessage) -> AppResult<String> {
    Ok(serde_json::to_string(msg)?)
}

/// Serialize a client message to a text frame.
pub fn encode_client(msg: &ClientMessage) -> AppResult<String> {
    Ok(serde_json::to_string(msg)?)
}

/// Decode an inbound client frame. Malformed frames are validation errors.
pub fn decode_client(text: &str) -> AppResult<ClientMessage> {
    serde_json::from_str(text)
        .map_err(|e| AppError::validation(format!("Malformed message: {e}")))
}

/// Decode a server frame received by a client.
pub fn decode_server(text: &str) -> AppResult<ServerMessage> {
    Ok(serde_json::from_str(text)?)
}
