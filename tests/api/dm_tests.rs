//! DM conversation API tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

use huddle::infrastructure::memory::InMemoryStore;

use crate::common::{json_body, TestApp};

fn app_with_users() -> TestApp {
    let store = InMemoryStore::closed();
    store.insert_user(1, "alice");
    store.insert_user(2, "bob");
    store.insert_user(3, "carol");
    TestApp::with_store(store)
}

#[tokio::test]
async fn test_create_dm_then_reuse() {
    // Arrange
    let app = app_with_users();

    // Act
    let first = app
        .post_json("/api/v1/dms", json!({"userId1": 1, "userId2": 2}))
        .await;
    let first_status = first.status();
    let first = json_body(first).await;

    let second = app
        .post_json("/api/v1/dms", json!({"userId1": 1, "userId2": 2}))
        .await;
    let second_status = second.status();
    let second = json_body(second).await;

    // Assert
    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["roomId"], second["roomId"]);
    assert_eq!(first["channelId"], second["channelId"]);
    assert_eq!(first["otherUser"]["username"], "bob");
    assert_eq!(first["otherUser"]["status"], "offline");
    assert_eq!(app.store.dm_room_count(), 1);
}

#[tokio::test]
async fn test_create_dm_is_order_independent() {
    let app = app_with_users();

    let forward = json_body(
        app.post_json("/api/v1/dms", json!({"userId1": 1, "userId2": 3}))
            .await,
    )
    .await;
    let reverse = app
        .post_json("/api/v1/dms", json!({"userId1": 3, "userId2": 1}))
        .await;
    assert_eq!(reverse.status(), StatusCode::OK);
    let reverse = json_body(reverse).await;

    assert_eq!(forward["roomId"], reverse["roomId"]);
    assert_eq!(reverse["otherUser"]["username"], "alice");
    assert_eq!(app.store.dm_room_count(), 1);
}

#[tokio::test]
async fn test_concurrent_create_yields_one_room() {
    let app = app_with_users();

    let requests = (0..8).map(|i| {
        let body = if i % 2 == 0 {
            json!({"userId1": 1, "userId2": 2})
        } else {
            json!({"userId1": 2, "userId2": 1})
        };
        app.post_json("/api/v1/dms", body)
    });
    let responses = futures::future::join_all(requests).await;

    let created = responses
        .iter()
        .filter(|r| r.status() == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);
    assert_eq!(app.store.dm_room_count(), 1);
}

#[test_case(json!({"userId1": 1, "userId2": 1}), StatusCode::BAD_REQUEST ; "self conversation")]
#[test_case(json!({"userId1": 1, "userId2": 99}), StatusCode::NOT_FOUND ; "unknown user")]
#[test_case(json!({"userId1": 0, "userId2": 2}), StatusCode::BAD_REQUEST ; "non positive id")]
#[test_case(json!({"userId1": 1}), StatusCode::BAD_REQUEST ; "missing field")]
#[tokio::test]
async fn test_create_dm_rejections(body: serde_json::Value, expected: StatusCode) {
    let app = app_with_users();

    let response = app.post_json("/api/v1/dms", body).await;

    assert_eq!(response.status(), expected);
    assert_eq!(app.store.dm_room_count(), 0);
}

#[tokio::test]
async fn test_list_dms_with_live_status() {
    // Arrange
    let app = app_with_users();
    app.post_json("/api/v1/dms", json!({"userId1": 1, "userId2": 2}))
        .await;
    let _bob = app.login(2, "bob").await;

    // Act
    let response = app.get("/api/v1/users/1/dms").await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let list = json_body(response).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["otherUser"]["id"], 2);
    assert_eq!(list[0]["otherUser"]["status"], "online");
}

#[tokio::test]
async fn test_list_dms_empty_for_user_without_rooms() {
    let app = app_with_users();

    let response = app.get("/api/v1/users/3/dms").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));
}

/// Live sessions of both members join the new room's presence audience
#[tokio::test]
async fn test_created_dm_subscribes_live_sessions() {
    // Arrange: alice and bob share no server
    let app = app_with_users();
    let mut alice = app.login(1, "alice").await;
    let bob = app.login(2, "bob").await;
    alice.drain().await;

    // Act
    let response = app
        .post_json("/api/v1/dms", json!({"userId1": 1, "userId2": 2}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    bob.emit("status:change", json!({"status": "dnd"}));

    // Assert
    let update = alice.expect("status:update").await;
    assert_eq!(update["userId"], 2);
    assert_eq!(update["status"], "dnd");
}
