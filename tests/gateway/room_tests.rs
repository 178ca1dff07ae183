//! Channel rooms: membership, messages and typing.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use huddle::domain::DmPair;
use huddle::infrastructure::memory::{GENERAL_CHANNEL_ID, RANDOM_CHANNEL_ID};

use crate::common::TestApp;

const GENERAL: i64 = GENERAL_CHANNEL_ID;
const RANDOM: i64 = RANDOM_CHANNEL_ID;

#[tokio::test]
async fn test_join_notifies_room_and_sends_member_snapshot() {
    // Arrange
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    alice.join(GENERAL);
    alice.expect("members:update").await;

    // Act
    bob.join(GENERAL);

    // Assert
    let joined = alice.expect("user:joined").await;
    assert_eq!(joined, json!({"channelId": GENERAL, "userId": 2, "username": "bob"}));

    let snapshot = bob.expect("members:update").await;
    assert_eq!(snapshot["channelId"], GENERAL);
    let mut ids: Vec<i64> = snapshot["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["userId"].as_i64().unwrap())
        .collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);

    bob.assert_none("user:joined").await;
}

/// A connection occupies at most one channel room
#[tokio::test]
async fn test_joining_another_channel_leaves_the_first() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    alice.join(GENERAL);
    bob.join(GENERAL);
    alice.expect("user:joined").await;

    bob.join(RANDOM);

    let left = alice.expect("user:left").await;
    assert_eq!(left["userId"], 2);
    let snapshot = alice.expect("members:update").await;
    assert_eq!(snapshot["members"], json!([{"userId": 1, "username": "alice"}]));

    alice.say(GENERAL, "anyone here?");
    alice.expect("message:receive").await;
    bob.assert_none("message:receive").await;
}

#[tokio::test]
async fn test_members_request_returns_snapshot() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    bob.emit("user:join", json!({"channelId": RANDOM, "username": "bobby"}));
    bob.expect("members:update").await;

    alice.emit("members:request", json!({"channelId": RANDOM}));

    let snapshot = alice.expect("members:update").await;
    assert_eq!(snapshot["members"], json!([{"userId": 2, "username": "bobby"}]));
}

#[tokio::test]
async fn test_message_reaches_room_and_sender_once() {
    // Arrange
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    alice.join(GENERAL);
    bob.join(GENERAL);
    alice.drain().await;
    bob.drain().await;

    // Act
    alice.say(GENERAL, "  hello there  ");

    // Assert
    let received = bob.expect("message:receive").await;
    assert_eq!(received["content"], "hello there");
    assert_eq!(received["authorId"], 1);
    assert_eq!(received["authorUsername"], "alice");
    assert!(received["id"].is_i64());

    let echoed = alice.drain_named("message:receive").await;
    assert_eq!(echoed.len(), 1);
    assert_eq!(echoed[0]["id"], received["id"]);
    assert_eq!(app.store.message_count(), 1);
}

/// The sender gets its copy even when it is not in the room
#[tokio::test]
async fn test_sender_outside_room_gets_direct_copy() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    bob.join(RANDOM);
    bob.expect("members:update").await;

    alice.say(RANDOM, "from outside");

    assert_eq!(bob.expect("message:receive").await["content"], "from outside");
    let echoed = alice.drain_named("message:receive").await;
    assert_eq!(echoed.len(), 1);
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    let app = TestApp::new();
    let alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    bob.join(GENERAL);
    bob.expect("members:update").await;

    for content in ["one", "two", "three", "four"] {
        alice.say(GENERAL, content);
    }

    let contents: Vec<String> = bob
        .drain_named("message:receive")
        .await
        .into_iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, vec!["one", "two", "three", "four"]);
}

/// Events from one connection are applied in submission order even when
/// the first one waits on storage
#[tokio::test]
async fn test_typing_after_send_is_delivered_after_the_message() {
    let app = TestApp::new();
    let alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    alice.join(GENERAL);
    bob.join(GENERAL);
    bob.drain().await;

    alice.say(GENERAL, "first");
    alice.emit("typing:start", json!({"channelId": GENERAL}));

    let names: Vec<String> = bob
        .drain()
        .await
        .into_iter()
        .map(|e| e["event"].as_str().unwrap().to_string())
        .filter(|n| n == "message:receive" || n == "typing:active")
        .collect();
    assert_eq!(names, vec!["message:receive", "typing:active"]);
}

#[tokio::test]
async fn test_content_rules() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    alice.join(GENERAL);

    alice.say(GENERAL, "   ");
    assert_eq!(alice.expect("error").await["code"], "validation");

    alice.say(GENERAL, &"x".repeat(2001));
    assert_eq!(alice.expect("error").await["code"], "content_too_long");

    assert_eq!(app.store.message_count(), 0);
}

#[tokio::test]
async fn test_claiming_another_identity_is_forbidden() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;

    alice.emit(
        "message:send",
        json!({"channelId": GENERAL, "content": "spoof", "userId": 2}),
    );

    let error = alice.expect("error").await;
    assert_eq!(error["code"], "forbidden");
    assert_eq!(app.store.message_count(), 0);
}

#[tokio::test]
async fn test_author_edits_and_deletes() {
    // Arrange
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    alice.join(GENERAL);
    bob.join(GENERAL);
    bob.expect("members:update").await;
    alice.say(GENERAL, "draft");
    let message_id = bob.expect("message:receive").await["id"].clone();

    // Act
    alice.emit(
        "message:edit",
        json!({"messageId": message_id, "channelId": GENERAL, "content": "final"}),
    );
    let updated = bob.expect("message:update").await;

    alice.emit(
        "message:delete",
        json!({"messageId": message_id, "channelId": GENERAL}),
    );
    let deleted = bob.expect("message:delete").await;

    // Assert
    assert_eq!(updated["content"], "final");
    assert!(updated["editedAt"].is_string());
    assert_eq!(deleted, json!({"messageId": message_id, "channelId": GENERAL}));
    assert_eq!(app.store.message_count(), 0);
}

/// Only the author may edit or delete
#[tokio::test]
async fn test_non_author_cannot_edit_or_delete() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    alice.join(GENERAL);
    bob.join(GENERAL);
    bob.expect("members:update").await;
    alice.say(GENERAL, "mine");
    let message_id = bob.expect("message:receive").await["id"].clone();

    bob.emit(
        "message:edit",
        json!({"messageId": message_id, "channelId": GENERAL, "content": "yours now"}),
    );
    assert_eq!(bob.expect("error").await["code"], "forbidden");

    bob.emit(
        "message:delete",
        json!({"messageId": message_id, "channelId": GENERAL}),
    );
    assert_eq!(bob.expect("error").await["code"], "forbidden");

    alice.assert_none("message:update").await;
    let stored = app.store.message(message_id.as_i64().unwrap()).unwrap();
    assert_eq!(stored.content, "mine");
}

#[tokio::test]
async fn test_dm_channel_message_notifies_absent_member() {
    let app = TestApp::new();
    app.store.insert_user(1, "alice");
    app.store.insert_user(2, "bob");
    let room = app.store.seed_dm(DmPair::new(1, 2).unwrap());
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    alice.join(room.channel_id);

    alice.say(room.channel_id, "ping");

    let notify = bob.expect("dm:notify").await;
    assert_eq!(notify["roomId"], room.id);
    assert_eq!(notify["channelId"], room.channel_id);
    assert_eq!(notify["message"]["content"], "ping");
    bob.assert_none("message:receive").await;

    alice.expect("message:receive").await;
    alice.assert_none("dm:notify").await;
}

#[tokio::test]
async fn test_typing_start_and_stop() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    alice.join(GENERAL);
    bob.join(GENERAL);
    alice.drain().await;

    bob.emit("typing:start", json!({"channelId": GENERAL}));
    let active = alice.expect("typing:active").await;
    assert_eq!(active, json!({"channelId": GENERAL, "userId": 2, "username": "bob"}));

    bob.emit("typing:stop", json!({"channelId": GENERAL}));
    alice.expect("typing:inactive").await;

    bob.assert_none("typing:active").await;
}

#[tokio::test(start_paused = true)]
async fn test_typing_expires_after_timeout() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    alice.join(GENERAL);
    bob.join(GENERAL);
    alice.drain().await;

    bob.emit("typing:start", json!({"channelId": GENERAL}));
    alice.expect("typing:active").await;

    tokio::time::sleep(Duration::from_secs(11)).await;

    let inactive = alice.expect("typing:inactive").await;
    assert_eq!(inactive["userId"], 2);
    bob.assert_none("typing:inactive").await;
}

/// An explicit stop wins over the pending timer
#[tokio::test(start_paused = true)]
async fn test_stopped_typing_does_not_expire_again() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let bob = app.login(2, "bob").await;
    alice.join(GENERAL);
    bob.join(GENERAL);
    alice.drain().await;

    bob.emit("typing:start", json!({"channelId": GENERAL}));
    bob.emit("typing:stop", json!({"channelId": GENERAL}));
    assert_eq!(alice.drain_named("typing:inactive").await.len(), 1);

    tokio::time::sleep(Duration::from_secs(11)).await;

    alice.assert_none("typing:inactive").await;
}

/// Leaving while typing clears the indicator for the rest of the room
#[tokio::test]
async fn test_disconnect_while_typing_clears_indicator() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let bob = app.login(2, "bob").await;
    alice.join(GENERAL);
    bob.join(GENERAL);
    alice.expect("user:joined").await;
    bob.emit("typing:start", json!({"channelId": GENERAL}));
    alice.expect("typing:active").await;

    bob.disconnect();

    alice.expect("typing:inactive").await;
    let left = alice.expect("user:left").await;
    assert_eq!(left["userId"], 2);
}

/// Typing belongs to the user, not to one of their connections
#[tokio::test]
async fn test_typing_is_shared_across_own_sessions() {
    // Arrange
    let app = TestApp::new();
    let mut desk = app.login(1, "alice").await;
    let mut phone = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    desk.join(GENERAL);
    phone.join(GENERAL);
    bob.join(GENERAL);
    desk.drain().await;
    phone.drain().await;
    bob.drain().await;

    // Act
    desk.emit("typing:start", json!({"channelId": GENERAL}));
    bob.expect("typing:active").await;
    desk.emit("typing:stop", json!({"channelId": GENERAL}));
    bob.expect("typing:inactive").await;

    // Assert
    let seen: Vec<_> = phone
        .drain()
        .await
        .into_iter()
        .filter(|e| e["event"] == "typing:active" || e["event"] == "typing:inactive")
        .collect();
    assert!(seen.is_empty(), "own session saw typing state: {:?}", seen);
}

#[tokio::test]
async fn test_closing_one_session_keeps_typing_alive() {
    let app = TestApp::new();
    let desk = app.login(1, "alice").await;
    let phone = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;
    desk.join(GENERAL);
    phone.join(GENERAL);
    bob.join(GENERAL);
    bob.drain().await;

    desk.emit("typing:start", json!({"channelId": GENERAL}));
    bob.expect("typing:active").await;

    phone.disconnect();

    let names: Vec<String> = bob
        .drain()
        .await
        .into_iter()
        .map(|e| e["event"].as_str().unwrap().to_string())
        .collect();
    assert!(names.contains(&"user:left".to_string()));
    assert!(!names.contains(&"typing:inactive".to_string()));

    desk.emit("typing:stop", json!({"channelId": GENERAL}));
    bob.expect("typing:inactive").await;
}

/// A DM channel admits only the two participants
#[tokio::test]
async fn test_outsider_cannot_join_dm_channel() {
    // Arrange
    let app = TestApp::new();
    app.store.insert_user(1, "alice");
    app.store.insert_user(2, "bob");
    app.store.insert_user(3, "mallory");
    let room = app.store.seed_dm(DmPair::new(1, 2).unwrap());
    let mut alice = app.login(1, "alice").await;
    let mut mallory = app.login(3, "mallory").await;
    alice.join(room.channel_id);
    alice.expect("members:update").await;

    // Act
    mallory.join(room.channel_id);

    // Assert
    let error = mallory.expect("error").await;
    assert_eq!(error["code"], "forbidden");
    assert_eq!(error["event"], "user:join");
    alice.assert_none("user:joined").await;

    alice.say(room.channel_id, "just us");
    alice.expect("message:receive").await;
    mallory.assert_none("message:receive").await;
}

#[tokio::test]
async fn test_outsider_cannot_post_to_dm_channel() {
    let app = TestApp::new();
    app.store.insert_user(1, "alice");
    app.store.insert_user(2, "bob");
    app.store.insert_user(3, "mallory");
    let room = app.store.seed_dm(DmPair::new(1, 2).unwrap());
    let mut bob = app.login(2, "bob").await;
    let mut mallory = app.login(3, "mallory").await;

    mallory.say(room.channel_id, "let me in");

    assert_eq!(mallory.expect("error").await["code"], "forbidden");
    mallory.assert_none("message:receive").await;
    bob.assert_none("dm:notify").await;
    assert_eq!(app.store.message_count(), 0);
}
