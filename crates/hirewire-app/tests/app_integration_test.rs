//! Integration tests for App and Bridge behavior.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - App state reflects the delivered events
//! - Unread totals follow the focus and mark-read rules
//! - Malformed input never reaches the store

use std::time::{Duration, Instant};

use hirewire_app::{App, AppAction, Bridge};
use hirewire_client::{ClientConfig, Environment};
use hirewire_proto::{Envelope, ServerEvent, payloads::session::AuthOk};
use serde_json::json;

#[derive(Clone)]
struct TestEnv;

impl Environment for TestEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = i as u8;
        }
    }
}

/// Process actions from App through Bridge and feed events back.
fn process_actions(app: &mut App, bridge: &mut Bridge<TestEnv>, actions: Vec<AppAction>) {
    for action in actions {
        match action {
            AppAction::Render => {},
            other => {
                let events = bridge.process_app_action(other);
                for event in events {
                    let more = app.handle(event);
                    process_actions(app, bridge, more);
                }
            },
        }
    }
}

/// Feed a raw envelope from the server through Bridge into App.
fn receive_envelope(app: &mut App, bridge: &mut Bridge<TestEnv>, envelope: Envelope) {
    let events = bridge.handle_envelope(envelope);
    for event in events {
        let actions = app.handle(event);
        process_actions(app, bridge, actions);
    }
}

/// Create a connected App/Bridge pair ready for testing.
fn connected_pair() -> (App, Bridge<TestEnv>) {
    let mut app = App::new("u1");
    let mut bridge = Bridge::new(TestEnv, ClientConfig::default());

    let actions = app.connect("u1", "tok1");
    process_actions(&mut app, &mut bridge, actions);
    bridge.handle_transport_up();

    let auth_ok =
        ServerEvent::AuthOk(AuthOk { session_id: "s1".to_string() }).into_envelope().unwrap();
    receive_envelope(&mut app, &mut bridge, auth_ok);
    assert!(app.is_connected(), "handshake should connect the app");

    (app, bridge)
}

fn message_new(id: &str, conversation: &str, sender: &str, sent_at: i64) -> Envelope {
    Envelope::new(
        "message:new",
        json!({
            "id": id,
            "conversationId": conversation,
            "senderId": sender,
            "body": format!("body {id}"),
            "sentAt": sent_at,
        }),
    )
}

#[test]
fn three_unfocused_messages_raise_the_badge_by_three() {
    let (mut app, mut bridge) = connected_pair();
    let before = app.total_unread();

    for (id, at) in [("m1", 100), ("m2", 200), ("m3", 300)] {
        receive_envelope(&mut app, &mut bridge, message_new(id, "c1", "u2", at));
    }
    assert_eq!(app.total_unread(), before + 3);

    // Mark-read restores the pre-event total.
    let actions = app.mark_read("c1");
    process_actions(&mut app, &mut bridge, actions);
    assert_eq!(app.total_unread(), before);

    // The mark-read also went to the server.
    let outgoing = bridge.take_outgoing();
    assert!(outgoing.iter().any(|e| e.event == "conversation:read"));
}

#[test]
fn malformed_event_is_dropped_and_badge_unchanged() {
    let (mut app, mut bridge) = connected_pair();
    receive_envelope(&mut app, &mut bridge, message_new("m1", "c1", "u2", 100));
    let before = app.total_unread();

    // message:new with the conversationId missing entirely.
    let malformed = Envelope::new(
        "message:new",
        json!({"id": "m2", "senderId": "u2", "body": "hi", "sentAt": 200}),
    );
    receive_envelope(&mut app, &mut bridge, malformed);

    assert_eq!(app.total_unread(), before);
    assert_eq!(app.store().conversation("c1").unwrap().messages().len(), 1);
}

#[test]
fn unknown_event_is_ignored_not_fatal() {
    let (mut app, mut bridge) = connected_pair();

    receive_envelope(
        &mut app,
        &mut bridge,
        Envelope::new("typing:started", json!({"conversationId": "c1"})),
    );

    // The dispatcher keeps running; a following valid event still applies.
    receive_envelope(&mut app, &mut bridge, message_new("m1", "c1", "u2", 100));
    assert_eq!(app.total_unread(), 1);
}

#[test]
fn duplicate_delivery_is_idempotent_end_to_end() {
    let (mut app, mut bridge) = connected_pair();

    receive_envelope(&mut app, &mut bridge, message_new("m1", "c1", "u2", 100));
    receive_envelope(&mut app, &mut bridge, message_new("m1", "c1", "u2", 100));

    let conversation = app.store().conversation("c1").unwrap();
    assert_eq!(conversation.messages().len(), 1);
    assert_eq!(app.total_unread(), 1);
}

#[test]
fn send_round_trip_updates_delivery_state() {
    let (mut app, mut bridge) = connected_pair();
    bridge.take_outgoing();

    let actions = app.send_message("c1", "are you still hiring?", 500);
    process_actions(&mut app, &mut bridge, actions);

    // Local echo is pending, nothing unread.
    let conversation = app.store().conversation("c1").unwrap();
    assert_eq!(conversation.messages().len(), 1);
    assert_eq!(conversation.messages()[0].delivery, hirewire_app::Delivery::Pending);
    assert_eq!(app.total_unread(), 0);

    // The wire saw the send; answer it with an ack.
    let outgoing = bridge.take_outgoing();
    assert_eq!(outgoing.len(), 1);
    let local_seq = outgoing[0].data["localSeq"].as_u64().unwrap();

    let ack = Envelope::new(
        "message:ack",
        json!({"localSeq": local_seq, "id": "m77", "sentAt": 510}),
    );
    receive_envelope(&mut app, &mut bridge, ack);

    let conversation = app.store().conversation("c1").unwrap();
    assert_eq!(conversation.messages()[0].id, "m77");
    assert_eq!(conversation.messages()[0].delivery, hirewire_app::Delivery::Sent);
}

#[test]
fn resync_snapshot_supersedes_local_state() {
    let (mut app, mut bridge) = connected_pair();
    receive_envelope(&mut app, &mut bridge, message_new("stale", "old", "u2", 50));

    let snapshot = Envelope::new(
        "resync:state",
        json!({
            "conversations": [{
                "id": "c1",
                "participantIds": ["u1", "u2"],
                "unreadCount": 2,
                "messages": [
                    {"id": "m1", "conversationId": "c1", "senderId": "u2", "body": "hi", "sentAt": 100, "seq": 1},
                    {"id": "m2", "conversationId": "c1", "senderId": "u2", "body": "there", "sentAt": 200, "seq": 2},
                ],
            }],
        }),
    );
    receive_envelope(&mut app, &mut bridge, snapshot);

    assert!(app.store().conversation("old").is_none(), "pre-resync state must not survive");
    let conversation = app.store().conversation("c1").unwrap();
    assert_eq!(conversation.messages().len(), 2);
    assert_eq!(app.total_unread(), 2);
}

#[test]
fn focused_conversation_stays_read_under_new_messages() {
    let (mut app, mut bridge) = connected_pair();
    receive_envelope(&mut app, &mut bridge, message_new("m1", "c1", "u2", 100));

    let actions = app.focus_conversation(Some("c1".to_string()));
    process_actions(&mut app, &mut bridge, actions);
    assert_eq!(app.total_unread(), 0);

    receive_envelope(&mut app, &mut bridge, message_new("m2", "c1", "u2", 200));
    receive_envelope(&mut app, &mut bridge, message_new("m3", "c2", "u3", 300));

    // Focused conversation absorbs messages silently; others do not.
    assert_eq!(app.total_unread(), 1);
}
