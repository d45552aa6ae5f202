//! Inbound message validation rules.

use creatorhub_core::AppError;
use creatorhub_core::AppResult;

/// Maximum length of a room id.
pub const MAX_ROOM_ID_LEN: usize = 128;

/// Maximum length of a chat or stream-chat message.
pub const MAX_CONTENT_LEN: usize = 4_000;

/// Maximum gift quantity in one event.
pub const MAX_GIFT_AMOUNT: u64 = 10_000;

/// Validate a raw inbound frame before decoding.
pub fn validate_frame(raw: &str, max_size: usize) -> AppResult<()> {
    if raw.len() > max_size {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {max_size} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validate the id part of a room name.
pub fn validate_room_id(id: &str) -> AppResult<()> {
    if id.is_empty() || id.len() > MAX_ROOM_ID_LEN {
        return Err(AppError::validation("Invalid room id length"));
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::validation("Room id contains invalid characters"));
    }

    Ok(())
}

/// Validate user-authored message text.
pub fn validate_content(content: &str) -> AppResult<()> {
    if content.trim().is_empty() {
        return Err(AppError::validation("Message content is empty"));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(AppError::validation(format!(
            "Message content exceeds {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a gift payload.
pub fn validate_gift(gift_type: &str, amount: u64) -> AppResult<()> {
    if gift_type.trim().is_empty() || gift_type.len() > 64 {
        return Err(AppError::validation("Invalid gift type"));
    }
    if amount == 0 || amount > MAX_GIFT_AMOUNT {
        return Err(AppError::validation(format!(
            "Gift amount must be between 1 and {MAX_GIFT_AMOUNT}"
        )));
    }
    Ok(())
}
