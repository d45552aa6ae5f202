//! Notification delivery, filtering, and read sync through the relay.

use std::time::Duration;

use creatorhub_entity::notification::{NewNotification, NotificationType, SubscriptionPreference};
use creatorhub_protocol::ServerMessage;

use crate::helpers::TestRelay;

fn subscribed(m: &ServerMessage) -> bool {
    matches!(m, ServerMessage::NotificationPreferences(Some(_)))
}

#[tokio::test]
async fn test_filtered_type_is_stored_but_not_pushed() {
    let relay = TestRelay::start().await;
    let (client, mut inbox) = relay.connect("alice-token").await;

    assert!(client.subscribe_notifications(SubscriptionPreference::only([NotificationType::Like])));
    inbox.expect(subscribed).await;

    let engine = &relay.state.engine;
    let alice = relay.users.alice;
    engine.notifications.dispatch(NewNotification::new(
        alice,
        NotificationType::Comment,
        "New comment",
        "Nice stream!",
    ));
    let like = engine.notifications.dispatch(NewNotification::new(
        alice,
        NotificationType::Like,
        "New like",
        "Someone liked your post",
    ));

    let pushed = inbox
        .expect(|m| matches!(m, ServerMessage::Notification(_)))
        .await;
    let ServerMessage::Notification(pushed) = pushed else {
        unreachable!()
    };
    assert_eq!(pushed.id, like.id);
    assert_eq!(pushed.kind, NotificationType::Like);

    assert!(client.get_notification_stats());
    let stats = inbox
        .expect(|m| matches!(m, ServerMessage::NotificationStats(_)))
        .await;
    let ServerMessage::NotificationStats(stats) = stats else {
        unreachable!()
    };
    assert_eq!(stats.total, 2);
    assert_eq!(stats.unread, 2);
    assert_eq!(stats.by_type.get(&NotificationType::Comment), Some(&1));

    client.disconnect().await;
    relay.stop().await;
}

#[tokio::test]
async fn test_offline_notification_counts_on_next_connect() {
    let relay = TestRelay::start().await;
    relay.state.engine.notifications.dispatch(NewNotification::new(
        relay.users.bob,
        NotificationType::Subscription,
        "New subscriber",
        "Alice subscribed to you",
    ));

    let (client, mut inbox) = relay.connect("bob-token").await;
    let stats = inbox
        .expect(|m| matches!(m, ServerMessage::NotificationStats(_)))
        .await;
    let ServerMessage::NotificationStats(stats) = stats else {
        unreachable!()
    };
    assert_eq!(stats.total, 1);
    assert_eq!(stats.unread, 1);

    client.disconnect().await;
    relay.stop().await;
}

#[tokio::test]
async fn test_mark_read_syncs_every_device() {
    let relay = TestRelay::start().await;
    let (phone, mut phone_inbox) = relay.connect("alice-token").await;
    let (laptop, mut laptop_inbox) = relay.connect("alice-token").await;
    assert!(phone.subscribe_notifications(SubscriptionPreference::default()));
    assert!(laptop.subscribe_notifications(SubscriptionPreference::default()));
    phone_inbox.expect(subscribed).await;
    laptop_inbox.expect(subscribed).await;

    let gift = relay.state.engine.notifications.dispatch(NewNotification::new(
        relay.users.alice,
        NotificationType::GiftReceived,
        "Gift",
        "You received a rose",
    ));
    phone_inbox
        .expect(|m| matches!(m, ServerMessage::Notification(n) if n.id == gift.id))
        .await;
    laptop_inbox
        .expect(|m| matches!(m, ServerMessage::Notification(n) if n.id == gift.id))
        .await;

    assert!(phone.mark_notification_read(gift.id));
    for inbox in [&mut phone_inbox, &mut laptop_inbox] {
        let read = inbox
            .expect(|m| matches!(m, ServerMessage::NotificationRead { .. }))
            .await;
        assert_eq!(
            read,
            ServerMessage::NotificationRead {
                notification_id: gift.id,
                unread: 0,
            }
        );
    }

    // Marking again changes nothing; only the caller gets an ack.
    assert!(phone.mark_notification_read(gift.id));
    phone_inbox
        .expect(|m| matches!(m, ServerMessage::NotificationRead { unread: 0, .. }))
        .await;
    laptop_inbox
        .assert_none(Duration::from_millis(200), |m| {
            matches!(m, ServerMessage::NotificationRead { .. })
        })
        .await;

    phone.disconnect().await;
    laptop.disconnect().await;
    relay.stop().await;
}

#[tokio::test]
async fn test_unsubscribe_stops_pushes() {
    let relay = TestRelay::start().await;
    let (client, mut inbox) = relay.connect("carol-token").await;
    assert!(client.subscribe_notifications(SubscriptionPreference::default()));
    inbox.expect(subscribed).await;

    assert!(client.unsubscribe_notifications());
    inbox
        .expect(|m| matches!(m, ServerMessage::NotificationPreferences(None)))
        .await;

    relay.state.engine.notifications.dispatch(NewNotification::new(
        relay.users.carol,
        NotificationType::Message,
        "Message",
        "Hi",
    ));
    inbox
        .assert_none(Duration::from_millis(200), |m| {
            matches!(m, ServerMessage::Notification(_))
        })
        .await;

    client.disconnect().await;
    relay.stop().await;
}
