//! Room membership and fan-out through the relay.

use std::time::Duration;

use creatorhub_protocol::{RoomKey, ServerMessage};

use crate::helpers::TestRelay;

const QUIET: Duration = Duration::from_millis(200);

#[tokio::test]
async fn test_gift_reaches_stream_members_only() {
    let relay = TestRelay::start().await;
    let (alice, _alice_inbox) = relay.connect("alice-token").await;
    let (bob, mut bob_inbox) = relay.connect("bob-token").await;
    let (carol, mut carol_inbox) = relay.connect("carol-token").await;

    assert!(bob.join_stream("42"));
    bob_inbox
        .expect(|m| matches!(m, ServerMessage::RoomJoined { room, .. } if room == "stream:42"))
        .await;

    assert!(alice.send_stream_gift("42", "rose", 5));
    let gift = bob_inbox
        .expect(|m| matches!(m, ServerMessage::StreamGift(_)))
        .await;
    let ServerMessage::StreamGift(gift) = gift else {
        unreachable!()
    };
    assert_eq!(gift.stream_id, "42");
    assert_eq!(gift.sender_id, relay.users.alice);
    assert_eq!(gift.gift_type, "rose");
    assert_eq!(gift.amount, 5);

    carol_inbox
        .assert_none(QUIET, |m| matches!(m, ServerMessage::StreamGift(_)))
        .await;

    for client in [alice, bob, carol] {
        client.disconnect().await;
    }
    relay.stop().await;
}

#[tokio::test]
async fn test_join_and_leave_are_acknowledged() {
    let relay = TestRelay::start().await;
    let (client, mut inbox) = relay.connect("alice-token").await;

    assert!(client.join_post_room("7"));
    let joined = inbox
        .expect(|m| matches!(m, ServerMessage::RoomJoined { .. }))
        .await;
    assert_eq!(
        joined,
        ServerMessage::RoomJoined {
            room: "post:7".to_string(),
            members: 1,
        }
    );
    assert_eq!(client.joined_rooms(), vec![RoomKey::post("7").unwrap()]);

    assert!(client.leave_post_room("7"));
    inbox
        .expect(|m| matches!(m, ServerMessage::RoomLeft { room } if room == "post:7"))
        .await;
    assert!(client.joined_rooms().is_empty());

    client.disconnect().await;
    relay.stop().await;
}

#[tokio::test]
async fn test_invalid_room_is_a_validation_error() {
    let relay = TestRelay::start().await;
    let (client, mut inbox) = relay.connect("alice-token").await;

    assert!(client.join_stream(""));
    let error = inbox
        .expect(|m| matches!(m, ServerMessage::Error { .. }))
        .await;
    let ServerMessage::Error { code, .. } = error else {
        unreachable!()
    };
    assert_eq!(code, "VALIDATION");
    assert!(client.joined_rooms().is_empty());

    client.disconnect().await;
    relay.stop().await;
}

#[tokio::test]
async fn test_viewer_count_follows_joins_and_leaves() {
    let relay = TestRelay::start().await;
    let (alice, mut alice_inbox) = relay.connect("alice-token").await;
    let (bob, _bob_inbox) = relay.connect("bob-token").await;

    let viewer_count = |m: &ServerMessage, n: usize| {
        matches!(m, ServerMessage::ViewerCountUpdate { stream_id, viewers: count } if stream_id == "9" && *count == n)
    };

    assert!(alice.join_stream("9"));
    alice_inbox.expect(|m| viewer_count(m, 1)).await;
    assert!(bob.join_stream("9"));
    alice_inbox.expect(|m| viewer_count(m, 2)).await;

    bob.disconnect().await;
    alice_inbox.expect(|m| viewer_count(m, 1)).await;

    alice.disconnect().await;
    relay.stop().await;
}

#[tokio::test]
async fn test_chat_message_and_typing() {
    let relay = TestRelay::start().await;
    let (alice, mut alice_inbox) = relay.connect("alice-token").await;
    let (bob, mut bob_inbox) = relay.connect("bob-token").await;

    for (client, inbox) in [(&alice, &mut alice_inbox), (&bob, &mut bob_inbox)] {
        assert!(client.join_chat_session("c1"));
        inbox
            .expect(|m| matches!(m, ServerMessage::RoomJoined { room, .. } if room == "chat:c1"))
            .await;
    }

    assert!(alice.set_typing("c1", true));
    let typing = bob_inbox
        .expect(|m| matches!(m, ServerMessage::UserTyping { .. }))
        .await;
    assert_eq!(
        typing,
        ServerMessage::UserTyping {
            chat_id: "c1".to_string(),
            user_id: relay.users.alice,
            is_typing: true,
        }
    );

    assert!(alice.send_message("c1", "hello", None));
    let message = bob_inbox
        .expect(|m| matches!(m, ServerMessage::NewMessage(_)))
        .await;
    let ServerMessage::NewMessage(message) = message else {
        unreachable!()
    };
    assert_eq!(message.content, "hello");
    assert_eq!(message.sender_id, relay.users.alice);

    alice_inbox
        .assert_none(QUIET, |m| matches!(m, ServerMessage::UserTyping { .. }))
        .await;

    alice.disconnect().await;
    bob.disconnect().await;
    relay.stop().await;
}
