//! Presence broadcast and queries through the relay.

use creatorhub_core::types::id::UserId;
use creatorhub_entity::presence::PresenceStatus;
use creatorhub_protocol::{PresenceUpdate, ServerMessage};

use crate::helpers::TestRelay;

fn presence_of(m: &ServerMessage, user: UserId, status: PresenceStatus) -> bool {
    matches!(m, ServerMessage::PresenceUpdate(r) if r.user_id == user && r.status == status)
}

#[tokio::test]
async fn test_watchers_see_online_busy_and_offline() {
    let relay = TestRelay::start().await;
    let alice_id = relay.users.alice;
    let (bob, mut bob_inbox) = relay.connect("bob-token").await;
    let (alice, _alice_inbox) = relay.connect("alice-token").await;

    bob_inbox
        .expect(|m| presence_of(m, alice_id, PresenceStatus::Online))
        .await;

    let mut update = PresenceUpdate::status(PresenceStatus::Busy);
    update.activity = Some("streaming".to_string());
    assert!(alice.update_presence(update));
    assert_eq!(alice.local_presence(), Some(PresenceStatus::Busy));
    let busy = bob_inbox
        .expect(|m| presence_of(m, alice_id, PresenceStatus::Busy))
        .await;
    let ServerMessage::PresenceUpdate(busy) = busy else {
        unreachable!()
    };
    assert_eq!(busy.activity.as_deref(), Some("streaming"));

    assert!(bob.get_online_connections());
    let online = bob_inbox
        .expect(|m| matches!(m, ServerMessage::OnlineConnections(_)))
        .await;
    let ServerMessage::OnlineConnections(online) = online else {
        unreachable!()
    };
    assert!(
        online
            .iter()
            .any(|r| r.user_id == alice_id && r.status == PresenceStatus::Busy)
    );
    assert!(online.iter().all(|r| r.user_id != relay.users.bob));

    alice.disconnect().await;
    assert_eq!(alice.local_presence(), None);
    bob_inbox
        .expect(|m| presence_of(m, alice_id, PresenceStatus::Offline))
        .await;

    bob.disconnect().await;
    relay.stop().await;
}

#[tokio::test]
async fn test_activity_history_is_newest_first() {
    let relay = TestRelay::start().await;
    let (alice, mut inbox) = relay.connect("alice-token").await;

    assert!(alice.update_presence(PresenceUpdate::status(PresenceStatus::Away)));
    assert!(alice.update_presence(PresenceUpdate::status(PresenceStatus::Busy)));
    assert!(alice.get_activity_history(Some(2)));

    let history = inbox
        .expect(|m| matches!(m, ServerMessage::ActivityHistory(_)))
        .await;
    let ServerMessage::ActivityHistory(history) = history else {
        unreachable!()
    };
    let statuses: Vec<_> = history.iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![PresenceStatus::Busy, PresenceStatus::Away]);

    alice.disconnect().await;
    relay.stop().await;
}
