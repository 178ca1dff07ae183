//! Presence fan-out and status changes.

use pretty_assertions::assert_eq;
use serde_json::json;

use huddle::infrastructure::memory::{InMemoryStore, DEFAULT_SERVER_ID};

use crate::common::{GatewayClient, TestApp};

const SHARED_SERVER: i64 = 50;
const OTHER_SERVER: i64 = 60;

/// alice(1) is friends with bob(2), shares a server with carol(3) and has
/// nothing in common with dave(4).
fn community() -> TestApp {
    let store = InMemoryStore::closed();
    for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
        store.insert_user(id, name);
    }
    store.create_server(SHARED_SERVER, "shared");
    store.create_server(OTHER_SERVER, "other");
    store.add_server_member(SHARED_SERVER, 1);
    store.add_server_member(SHARED_SERVER, 3);
    store.add_server_member(OTHER_SERVER, 4);
    store.add_friendship(1, 2);
    TestApp::with_store(store)
}

async fn observers(app: &TestApp) -> (GatewayClient, GatewayClient, GatewayClient) {
    let mut bob = app.login(2, "bob").await;
    let mut carol = app.login(3, "carol").await;
    let mut dave = app.login(4, "dave").await;
    bob.drain().await;
    carol.drain().await;
    dave.drain().await;
    (bob, carol, dave)
}

async fn status_of_alice(client: &mut GatewayClient) -> Vec<String> {
    client
        .drain_named("status:update")
        .await
        .into_iter()
        .filter(|u| u["userId"] == 1)
        .map(|u| u["status"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_status_reaches_friends_and_co_members_only() {
    // Arrange
    let app = community();
    let (mut bob, mut carol, mut dave) = observers(&app).await;

    // Act
    let _alice = app.login(1, "alice").await;

    // Assert
    assert_eq!(status_of_alice(&mut bob).await, vec!["online"]);
    assert_eq!(status_of_alice(&mut carol).await, vec!["online"]);
    assert!(status_of_alice(&mut dave).await.is_empty());
}

#[tokio::test]
async fn test_status_change_fans_out() {
    let app = community();
    let (mut bob, mut carol, mut dave) = observers(&app).await;
    let alice = app.login(1, "alice").await;
    bob.drain().await;
    carol.drain().await;

    alice.emit("status:change", json!({"status": "dnd"}));

    let update = bob.expect("status:update").await;
    assert_eq!(update, json!({"userId": 1, "username": "alice", "status": "dnd"}));
    assert_eq!(status_of_alice(&mut carol).await, vec!["dnd"]);
    assert!(status_of_alice(&mut dave).await.is_empty());
}

#[tokio::test]
async fn test_invisible_looks_offline() {
    let app = community();
    let (mut bob, _carol, _dave) = observers(&app).await;
    let alice = app.login(1, "alice").await;
    bob.drain().await;

    alice.emit("status:change", json!({"status": "invisible"}));
    assert_eq!(status_of_alice(&mut bob).await, vec!["offline"]);

    bob.emit("users:online", json!({"serverIds": [SHARED_SERVER]}));
    let online = bob.expect("users:online").await;
    assert_eq!(online, json!({"users": []}));

    // Going offline from invisible is not news to anyone
    alice.disconnect();
    assert!(status_of_alice(&mut bob).await.is_empty());
}

#[tokio::test]
async fn test_offline_is_not_a_selectable_status() {
    let app = community();
    let mut alice = app.login(1, "alice").await;

    alice.emit("status:change", json!({"status": "offline"}));
    assert_eq!(alice.expect("error").await["code"], "validation");

    alice.emit("status:change", json!({"status": "sleepy"}));
    assert_eq!(alice.expect("error").await["code"], "validation");
}

#[tokio::test]
async fn test_offline_only_after_last_session() {
    // Arrange
    let app = community();
    let (mut bob, _carol, _dave) = observers(&app).await;
    let first = app.login(1, "alice").await;
    let second = app.login(1, "alice").await;
    assert_eq!(status_of_alice(&mut bob).await, vec!["online"]);

    // Act & Assert
    first.disconnect();
    assert!(status_of_alice(&mut bob).await.is_empty());

    second.disconnect();
    assert_eq!(status_of_alice(&mut bob).await, vec!["offline"]);
    assert_eq!(
        app.store.user(1).unwrap().status,
        huddle::domain::UserStatus::Offline
    );
}

#[tokio::test]
async fn test_users_online_lists_connected_members() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let bob = app.login(2, "bob").await;
    app.login(3, "carol").await.disconnect();
    bob.emit("status:change", json!({"status": "idle"}));
    alice.drain().await;

    alice.emit("users:online", json!({"serverIds": [DEFAULT_SERVER_ID]}));

    let online = alice.expect("users:online").await;
    let mut seen: Vec<(i64, String)> = online["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| (u["id"].as_i64().unwrap(), u["status"].as_str().unwrap().to_string()))
        .collect();
    seen.sort();
    assert_eq!(seen, vec![(1, "online".to_string()), (2, "idle".to_string())]);
}
