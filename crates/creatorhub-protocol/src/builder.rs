//! Builder helpers for constructing outbound messages.

use chrono::Utc;
use uuid::Uuid;

use creatorhub_core::AppError;
use creatorhub_core::types::id::UserId;

use crate::types::{ChatMessage, GiftEvent, ServerMessage, StreamChat};

/// Build an `error` event from an application error.
pub fn build_error(err: &AppError) -> ServerMessage {
    ServerMessage::Error {
        code: err.code(),
        message: err.message.clone(),
    }
}

/// Build an `auth_error` event.
pub fn build_auth_error(reason: impl Into<String>) -> ServerMessage {
    ServerMessage::AuthError {
        reason: reason.into(),
    }
}

/// Build a `new_message` event.
pub fn build_chat_message(
    chat_id: &str,
    sender_id: UserId,
    content: String,
    message_type: Option<String>,
) -> ServerMessage {
    ServerMessage::NewMessage(ChatMessage {
        id: Uuid::new_v4(),
        chat_id: chat_id.to_string(),
        sender_id,
        content,
        message_type: message_type.unwrap_or_else(|| "text".to_string()),
        timestamp: Utc::now(),
    })
}

/// Build a `user_typing` event.
pub fn build_typing(chat_id: &str, user_id: UserId, is_typing: bool) -> ServerMessage {
    ServerMessage::UserTyping {
        chat_id: chat_id.to_string(),
        user_id,
        is_typing,
    }
}

/// Build a `stream_chat_message` event.
pub fn build_stream_chat(stream_id: &str, sender_id: UserId, content: String) -> ServerMessage {
    ServerMessage::StreamChatMessage(StreamChat {
        id: Uuid::new_v4(),
        stream_id: stream_id.to_string(),
        sender_id,
        content,
        timestamp: Utc::now(),
    })
}

/// Build a `stream_gift` event.
pub fn build_stream_gift(
    stream_id: &str,
    sender_id: UserId,
    gift_type: String,
    amount: u64,
) -> ServerMessage {
    ServerMessage::StreamGift(GiftEvent {
        stream_id: stream_id.to_string(),
        sender_id,
        gift_type,
        amount,
        timestamp: Utc::now(),
    })
}

/// Build a `viewer_count_update` event.
pub fn build_viewer_count(stream_id: &str, viewers: usize) -> ServerMessage {
    ServerMessage::ViewerCountUpdate {
        stream_id: stream_id.to_string(),
        viewers,
    }
}
