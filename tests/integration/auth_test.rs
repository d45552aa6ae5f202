//! Credential handshake over a real socket.

use std::time::Duration;

use creatorhub_client::{ClientEvent, ConnectionState, RelayClient};
use creatorhub_entity::notification::{NewNotification, NotificationType};
use creatorhub_protocol::ServerMessage;

use crate::helpers::{Inbox, TestRelay};

#[tokio::test]
async fn test_valid_token_authenticates_and_gets_initial_stats() {
    let relay = TestRelay::start().await;
    let client = RelayClient::new(&relay.client_config());
    let mut inbox = Inbox::attach(&client);
    client.connect("alice-token");

    let msg = inbox
        .expect(|m| matches!(m, ServerMessage::Authenticated { .. }))
        .await;
    let ServerMessage::Authenticated { user_id, features } = msg else {
        unreachable!()
    };
    assert_eq!(user_id, relay.users.alice);
    assert!(features.iter().any(|f| f == "notifications"));

    let stats = inbox
        .expect(|m| matches!(m, ServerMessage::NotificationStats(_)))
        .await;
    let ServerMessage::NotificationStats(stats) = stats else {
        unreachable!()
    };
    assert_eq!(stats.total, 0);
    assert_eq!(stats.unread, 0);

    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.user_id(), Some(relay.users.alice));

    client.disconnect().await;
    relay.stop().await;
}

#[tokio::test]
async fn test_bad_token_is_rejected_without_retry() {
    let relay = TestRelay::start().await;
    let client = RelayClient::new(&relay.client_config());
    let mut inbox = Inbox::attach(&client);
    client.connect("not-a-token");

    let msg = inbox
        .expect(|m| matches!(m, ServerMessage::AuthError { .. }))
        .await;
    assert!(matches!(msg, ServerMessage::AuthError { .. }));

    inbox
        .next_matching(|e| matches!(e, ClientEvent::StateChanged(ConnectionState::Disconnected)))
        .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let rest = inbox.drain();
    assert!(
        !rest
            .iter()
            .any(|e| matches!(e, ClientEvent::Reconnecting { .. })),
        "rejected credential must not be retried: {rest:?}"
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(relay.state.engine.connections.connection_count(), 0);

    relay.stop().await;
}

#[tokio::test]
async fn test_no_events_after_disconnect() {
    let relay = TestRelay::start().await;
    let (client, mut inbox) = relay.connect("alice-token").await;

    client.disconnect().await;
    inbox.drain();

    relay.state.engine.notifications.dispatch(NewNotification::new(
        relay.users.alice,
        NotificationType::Like,
        "Liked",
        "Someone liked your post",
    ));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(inbox.drain().is_empty());
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.local_presence(), None);

    relay.stop().await;
}
