use super::*;
use shared::domain::{ClientId, RoomId};

fn topic() -> Topic {
    Topic::room(&RoomId::new("retro"))
}

#[test]
fn room_topic_uses_room_prefix() {
    assert_eq!(topic().as_str(), "room:retro");
}

#[tokio::test]
async fn published_messages_reach_every_subscriber_including_sender() {
    let hub = LocalHub::new();
    let alice = hub.connect(ClientId::new("alice"));
    let bob = hub.connect(ClientId::new("bob"));

    let mut alice_rx = alice.subscribe(&topic()).await.expect("alice subscribe");
    let mut bob_rx = bob.subscribe(&topic()).await.expect("bob subscribe");

    alice
        .publish(&topic(), "play_timer", serde_json::json!({ "seconds": 10 }))
        .await
        .expect("publish");

    let seen_by_bob = bob_rx.recv().await.expect("bob receives");
    let seen_by_alice = alice_rx.recv().await.expect("alice receives echo");
    assert_eq!(seen_by_bob.name, "play_timer");
    assert_eq!(seen_by_bob.client_id, ClientId::new("alice"));
    assert_eq!(seen_by_alice, seen_by_bob);
}

#[tokio::test]
async fn history_is_newest_first_and_bounded() {
    let hub = LocalHub::with_history_limit(2);
    let alice = hub.connect(ClientId::new("alice"));

    for name in ["first", "second", "third"] {
        alice
            .publish(&topic(), name, serde_json::json!({}))
            .await
            .expect("publish");
    }

    let names: Vec<String> = alice
        .history(&topic())
        .await
        .expect("history")
        .into_iter()
        .map(|message| message.name)
        .collect();
    assert_eq!(names, ["third", "second"]);
}

#[tokio::test]
async fn presence_enter_update_and_leave_are_broadcast() {
    let hub = LocalHub::new();
    let alice = hub.connect(ClientId::new("alice"));
    let bob = hub.connect(ClientId::new("bob"));
    let mut events = alice
        .presence_subscribe(&topic())
        .await
        .expect("presence subscribe");

    bob.presence_enter(&topic(), PresenceData { is_leader: true })
        .await
        .expect("enter");
    bob.presence_enter(&topic(), PresenceData { is_leader: true })
        .await
        .expect("re-enter");
    bob.presence_leave(&topic()).await.expect("leave");

    let enter = events.recv().await.expect("enter event");
    assert_eq!(enter.action, PresenceAction::Enter);
    let repeat = events.recv().await.expect("repeat event");
    assert_eq!(repeat.action, PresenceAction::Update);
    let leave = events.recv().await.expect("leave event");
    assert_eq!(leave.action, PresenceAction::Leave);
    assert!(leave.member.data.is_leader, "leave carries last known data");
    assert!(hub.members(&topic()).await.is_empty());
}

#[tokio::test]
async fn offline_connection_fails_with_closed() {
    let hub = LocalHub::new();
    let alice = hub.connect(ClientId::new("alice"));
    alice.set_offline(true);

    let err = alice
        .publish(&topic(), "add_item", serde_json::json!({}))
        .await
        .expect_err("offline publish must fail");
    assert!(matches!(err, ChannelError::Closed));

    alice.set_offline(false);
    assert!(alice.history(&topic()).await.expect("history").is_empty());
}

#[tokio::test]
async fn empty_event_name_is_rejected() {
    let hub = LocalHub::new();
    let alice = hub.connect(ClientId::new("alice"));

    let err = alice
        .publish(&topic(), " ", serde_json::json!({}))
        .await
        .expect_err("blank name must fail");
    assert!(matches!(err, ChannelError::Rejected(_)));
    assert!(alice.history(&topic()).await.expect("history").is_empty());
}

#[tokio::test]
async fn non_object_payload_is_a_codec_error() {
    let hub = LocalHub::new();
    let alice = hub.connect(ClientId::new("alice"));

    let err = alice
        .publish(&topic(), "add_item", serde_json::json!([1, 2]))
        .await
        .expect_err("array payload must fail");
    assert!(matches!(err, ChannelError::Codec(_)));
    assert!(alice.history(&topic()).await.expect("history").is_empty());
}

#[tokio::test]
async fn stalled_connection_times_out() {
    let hub = LocalHub::new();
    let alice = hub
        .connect(ClientId::new("alice"))
        .with_op_timeout(std::time::Duration::from_millis(20));
    alice.set_stalled(true);

    let err = alice
        .presence_get(&topic())
        .await
        .expect_err("stalled fetch must time out");
    assert!(matches!(err, ChannelError::Timeout));

    alice.set_stalled(false);
    assert!(alice.presence_get(&topic()).await.expect("members").is_empty());
}
