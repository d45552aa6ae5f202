//! Reconnect backoff and session restore against real sockets.

use std::time::Duration;

use tokio::net::TcpListener;

use creatorhub_client::{ClientEvent, ConnectionState, RelayClient};
use creatorhub_protocol::{RoomKey, ServerMessage};

use crate::helpers::{Inbox, TestRelay, client_config};

#[tokio::test]
async fn test_backoff_schedule_then_give_up_once() {
    // Reserve a port, then free it so every connect is refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RelayClient::new(&client_config(format!("ws://{addr}/ws"), 3, 10));
    let mut inbox = Inbox::attach(&client);
    client.connect("alice-token");

    let mut delays = Vec::new();
    let attempts = loop {
        match inbox.next().await {
            ClientEvent::Reconnecting { attempt, delay } => {
                assert_eq!(attempt as usize, delays.len() + 1);
                delays.push(delay);
            }
            ClientEvent::MaxReconnectAttemptsReached { attempts } => break attempts,
            _ => {}
        }
    };

    assert_eq!(
        delays,
        vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(40)
        ]
    );
    assert_eq!(attempts, 3);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let rest = inbox.drain();
    assert!(
        !rest.iter().any(|e| matches!(
            e,
            ClientEvent::MaxReconnectAttemptsReached { .. } | ClientEvent::Reconnecting { .. }
        )),
        "no further attempts after giving up: {rest:?}"
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_disconnect_cancels_pending_backoff() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RelayClient::new(&client_config(format!("ws://{addr}/ws"), 5, 300));
    let mut inbox = Inbox::attach(&client);
    client.connect("alice-token");

    inbox
        .next_matching(|e| matches!(e, ClientEvent::Reconnecting { attempt: 1, .. }))
        .await;
    client.disconnect().await;
    inbox.drain();
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // Long enough for the 300ms and 600ms retries to have fired.
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let rest = inbox.drain();
    assert!(
        !rest.iter().any(|e| matches!(
            e,
            ClientEvent::Reconnecting { .. } | ClientEvent::MaxReconnectAttemptsReached { .. }
        )),
        "backoff timer survived disconnect: {rest:?}"
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_restores_rooms_and_subscription() {
    let relay = TestRelay::start().await;
    let addr = relay.addr;
    let (client, mut inbox) = relay.connect("alice-token").await;

    assert!(client.subscribe_notifications(Default::default()));
    inbox
        .expect(|m| matches!(m, ServerMessage::NotificationPreferences(Some(_))))
        .await;
    assert!(client.join_stream("42"));
    inbox
        .expect(|m| matches!(m, ServerMessage::RoomJoined { room, .. } if room == "stream:42"))
        .await;

    // Restart the relay on the same port.
    let users = relay.stop().await;
    inbox
        .next_matching(|e| matches!(e, ClientEvent::Reconnecting { .. }))
        .await;
    let relay = TestRelay::start_on(addr, users).await;

    inbox
        .expect(|m| matches!(m, ServerMessage::Authenticated { .. }))
        .await;
    inbox
        .expect(|m| matches!(m, ServerMessage::NotificationPreferences(Some(_))))
        .await;
    inbox
        .expect(|m| matches!(m, ServerMessage::RoomJoined { room, .. } if room == "stream:42"))
        .await;
    assert_eq!(client.state(), ConnectionState::Connected);

    let room = RoomKey::stream("42").unwrap();
    assert_eq!(relay.state.engine.rooms.member_count(&room), 1);

    client.disconnect().await;
    relay.stop().await;
}
