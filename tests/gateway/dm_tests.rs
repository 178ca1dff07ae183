//! Direct messages over the gateway.

use pretty_assertions::assert_eq;
use serde_json::json;

use huddle::infrastructure::memory::InMemoryStore;

use crate::common::TestApp;

#[tokio::test]
async fn test_dm_send_reaches_both_members() {
    // Arrange
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;

    // Act
    alice.emit("dm:send", json!({"receiverId": 2, "content": "psst"}));

    // Assert
    let received = bob.expect("dm:receive").await;
    let echoed = alice.expect("dm:receive").await;
    assert_eq!(received["message"]["content"], "psst");
    assert_eq!(received["message"]["authorId"], 1);
    assert_eq!(received["roomId"], echoed["roomId"]);
    assert_eq!(app.store.dm_room_count(), 1);
}

/// Opening from either side lands in the same room
#[tokio::test]
async fn test_dm_open_is_symmetric() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let mut bob = app.login(2, "bob").await;

    alice.emit("dm:open", json!({"userId": 2}));
    let from_alice = alice.expect("dm:opened").await;
    bob.emit("dm:open", json!({"userId": 1}));
    let from_bob = bob.expect("dm:opened").await;

    assert_eq!(from_alice["roomId"], from_bob["roomId"]);
    assert_eq!(from_alice["channelId"], from_bob["channelId"]);
    assert_eq!(from_alice["otherUser"]["username"], "bob");
    assert_eq!(from_alice["otherUser"]["status"], "online");
    assert_eq!(from_bob["otherUser"]["username"], "alice");
    assert_eq!(app.store.dm_room_count(), 1);
}

#[tokio::test]
async fn test_messaging_yourself_is_rejected() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;

    alice.emit("dm:send", json!({"receiverId": 1, "content": "note to self"}));
    assert_eq!(alice.expect("error").await["code"], "bad_request");

    alice.emit("dm:open", json!({"userId": 1}));
    assert_eq!(alice.expect("error").await["code"], "bad_request");

    assert_eq!(app.store.dm_room_count(), 0);
}

#[tokio::test]
async fn test_dm_to_unknown_user_is_not_found() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;

    alice.emit("dm:open", json!({"userId": 404}));

    assert_eq!(alice.expect("error").await["code"], "not_found");
}

#[tokio::test]
async fn test_dm_list_describes_the_other_side() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let _bob = app.login(2, "bob").await;
    let carol = app.login(3, "carol").await;
    carol.disconnect();
    alice.emit("dm:open", json!({"userId": 2}));
    alice.expect("dm:opened").await;
    alice.emit("dm:open", json!({"userId": 3}));
    alice.expect("dm:opened").await;

    alice.send(json!({"event": "dm:list"}));

    let list = alice.expect("dm:conversations").await;
    let mut others: Vec<(String, String)> = list["conversations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["otherUser"]["username"].as_str().unwrap().to_string(),
                c["otherUser"]["status"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    others.sort();
    assert_eq!(
        others,
        vec![
            ("bob".to_string(), "online".to_string()),
            ("carol".to_string(), "offline".to_string()),
        ]
    );
}

/// A new DM room joins the presence audience of both members
#[tokio::test]
async fn test_dm_partner_sees_status_changes() {
    let store = InMemoryStore::closed();
    store.insert_user(1, "alice");
    store.insert_user(2, "bob");
    let app = TestApp::with_store(store);
    let mut alice = app.login(1, "alice").await;
    let bob = app.login(2, "bob").await;

    alice.emit("dm:send", json!({"receiverId": 2, "content": "hi"}));
    alice.expect("dm:receive").await;
    bob.emit("status:change", json!({"status": "idle"}));

    let update = alice.expect("status:update").await;
    assert_eq!(update["userId"], 2);
    assert_eq!(update["status"], "idle");
}
