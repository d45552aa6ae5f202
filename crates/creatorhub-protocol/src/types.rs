//! Client and server message definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use creatorhub_core::types::id::{NotificationId, UserId};
use creatorhub_entity::notification::{Notification, NotificationStats, SubscriptionPreference};
use creatorhub_entity::presence::{ActivityEvent, PresenceRecord, PresenceStatus};

/// Messages sent by a client to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Present a bearer credential. Must be the first message.
    Authenticate {
        /// Bearer token.
        token: String,
    },
    /// Replace this connection's notification preference.
    SubscribeNotifications(SubscriptionPreference),
    /// Clear this connection's notification preference.
    UnsubscribeNotifications,
    /// Mark one notification as read.
    MarkNotificationRead {
        /// Notification to mark.
        notification_id: NotificationId,
    },
    /// Request stats over the caller's retained notifications.
    GetNotificationStats,
    /// Change the caller's presence.
    UpdatePresence(PresenceUpdate),
    /// Request recent presence activity in the caller's network.
    GetActivityHistory {
        /// Maximum entries to return.
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Request the online users visible to the caller.
    GetOnlineConnections,
    /// Join a room by its full name.
    JoinRoom {
        /// Room name, e.g. `post:42`.
        room: String,
    },
    /// Leave a room by its full name.
    LeaveRoom {
        /// Room name.
        room: String,
    },
    /// Start watching a stream.
    JoinStream {
        /// Stream id.
        stream_id: String,
    },
    /// Stop watching a stream.
    LeaveStream {
        /// Stream id.
        stream_id: String,
    },
    /// Join a post's live counter room.
    JoinPostRoom {
        /// Post id.
        post_id: String,
    },
    /// Leave a post's room.
    LeavePostRoom {
        /// Post id.
        post_id: String,
    },
    /// Join a direct-message session.
    JoinChatSession {
        /// Chat id.
        chat_id: String,
    },
    /// Leave a direct-message session.
    LeaveChatSession {
        /// Chat id.
        chat_id: String,
    },
    /// Send a chat message.
    SendMessage {
        /// Chat id.
        chat_id: String,
        /// Message text.
        content: String,
        /// Message kind, `text` when absent.
        #[serde(default)]
        message_type: Option<String>,
    },
    /// Typing indicator on.
    TypingStart {
        /// Chat id.
        chat_id: String,
    },
    /// Typing indicator off.
    TypingStop {
        /// Chat id.
        chat_id: String,
    },
    /// Post to a stream's live chat.
    StreamChatMessage {
        /// Stream id.
        stream_id: String,
        /// Message text.
        content: String,
    },
    /// Send a gift to a stream.
    SendStreamGift {
        /// Stream id.
        stream_id: String,
        /// Gift kind, e.g. `rose`.
        gift_type: String,
        /// Quantity.
        amount: u64,
    },
    /// Like or unlike a post.
    TogglePostLike {
        /// Post id.
        post_id: String,
        /// New like state.
        liked: bool,
    },
}

/// Payload of `update_presence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    /// New status.
    pub status: PresenceStatus,
    /// Activity label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    /// Location hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Device hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl PresenceUpdate {
    /// An update carrying only a status.
    pub fn status(status: PresenceStatus) -> Self {
        Self {
            status,
            activity: None,
            location: None,
            device: None,
        }
    }
}

/// Messages sent by the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Authentication succeeded.
    Authenticated {
        /// The verified user.
        user_id: UserId,
        /// Features enabled on this relay.
        features: Vec<String>,
    },
    /// Authentication failed. The socket closes afterwards.
    AuthError {
        /// Why.
        reason: String,
    },
    /// A live notification push.
    Notification(Notification),
    /// Stats over the caller's retained notifications.
    NotificationStats(NotificationStats),
    /// Acknowledges `mark_notification_read`.
    NotificationRead {
        /// The notification.
        notification_id: NotificationId,
        /// Remaining unread count.
        unread: u64,
    },
    /// Acknowledges a preference change; `null` after unsubscribe.
    NotificationPreferences(Option<SubscriptionPreference>),
    /// A watched user's presence changed.
    PresenceUpdate(PresenceRecord),
    /// Online users visible to the caller.
    OnlineConnections(Vec<PresenceRecord>),
    /// Recent presence activity, newest first.
    ActivityHistory(Vec<ActivityEvent>),
    /// Acknowledges a join.
    RoomJoined {
        /// Room name.
        room: String,
        /// Member count after the join.
        members: usize,
    },
    /// Acknowledges a leave.
    RoomLeft {
        /// Room name.
        room: String,
    },
    /// A chat message in a joined chat session.
    NewMessage(ChatMessage),
    /// Typing indicator from another chat member.
    UserTyping {
        /// Chat id.
        chat_id: String,
        /// Who is typing.
        user_id: UserId,
        /// Started or stopped.
        is_typing: bool,
    },
    /// A stream's viewer count changed.
    ViewerCountUpdate {
        /// Stream id.
        stream_id: String,
        /// Current viewers.
        viewers: usize,
    },
    /// A stream live-chat message.
    StreamChatMessage(StreamChat),
    /// A gift sent to a stream.
    StreamGift(GiftEvent),
    /// A post's like state changed.
    PostLikeUpdate {
        /// Post id.
        post_id: String,
        /// Who toggled.
        user_id: UserId,
        /// New like state.
        liked: bool,
    },
    /// A request was refused or malformed.
    Error {
        /// Error kind code, e.g. `VALIDATION`.
        code: String,
        /// Human-readable description.
        message: String,
    },
}

impl ServerMessage {
    /// The wire event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::AuthError { .. } => "auth_error",
            Self::Notification(_) => "notification",
            Self::NotificationStats(_) => "notification_stats",
            Self::NotificationRead { .. } => "notification_read",
            Self::NotificationPreferences(_) => "notification_preferences",
            Self::PresenceUpdate(_) => "presence_update",
            Self::OnlineConnections(_) => "online_connections",
            Self::ActivityHistory(_) => "activity_history",
            Self::RoomJoined { .. } => "room_joined",
            Self::RoomLeft { .. } => "room_left",
            Self::NewMessage(_) => "new_message",
            Self::UserTyping { .. } => "user_typing",
            Self::ViewerCountUpdate { .. } => "viewer_count_update",
            Self::StreamChatMessage(_) => "stream_chat_message",
            Self::StreamGift(_) => "stream_gift",
            Self::PostLikeUpdate { .. } => "post_like_update",
            Self::Error { .. } => "error",
        }
    }
}

impl ClientMessage {
    /// The wire event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::SubscribeNotifications(_) => "subscribe_notifications",
            Self::UnsubscribeNotifications => "unsubscribe_notifications",
            Self::MarkNotificationRead { .. } => "mark_notification_read",
            Self::GetNotificationStats => "get_notification_stats",
            Self::UpdatePresence(_) => "update_presence",
            Self::GetActivityHistory { .. } => "get_activity_history",
            Self::GetOnlineConnections => "get_online_connections",
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom { .. } => "leave_room",
            Self::JoinStream { .. } => "join_stream",
            Self::LeaveStream { .. } => "leave_stream",
            Self::JoinPostRoom { .. } => "join_post_room",
            Self::LeavePostRoom { .. } => "leave_post_room",
            Self::JoinChatSession { .. } => "join_chat_session",
            Self::LeaveChatSession { .. } => "leave_chat_session",
            Self::SendMessage { .. } => "send_message",
            Self::TypingStart { .. } => "typing_start",
            Self::TypingStop { .. } => "typing_stop",
            Self::StreamChatMessage { .. } => "stream_chat_message",
            Self::SendStreamGift { .. } => "send_stream_gift",
            Self::TogglePostLike { .. } => "toggle_post_like",
        }
    }
}

/// A direct message relayed to a chat room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Relay-assigned message id.
    pub id: Uuid,
    /// Chat id.
    pub chat_id: String,
    /// Author.
    pub sender_id: UserId,
    /// Message text.
    pub content: String,
    /// Message kind.
    pub message_type: String,
    /// When the relay accepted it.
    pub timestamp: DateTime<Utc>,
}

/// A stream live-chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamChat {
    /// Relay-assigned message id.
    pub id: Uuid,
    /// Stream id.
    pub stream_id: String,
    /// Author.
    pub sender_id: UserId,
    /// Message text.
    pub content: String,
    /// When the relay accepted it.
    pub timestamp: DateTime<Utc>,
}

/// A gift sent to a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftEvent {
    /// Stream id.
    pub stream_id: String,
    /// Sender.
    pub sender_id: UserId,
    /// Gift kind.
    pub gift_type: String,
    /// Quantity.
    pub amount: u64,
    /// When the relay accepted it.
    pub timestamp: DateTime<Utc>,
}
