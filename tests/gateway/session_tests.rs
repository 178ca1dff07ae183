//! Connection lifecycle: hello, heartbeat, authenticate, teardown.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use pretty_assertions::assert_eq;
use serde_json::json;

use huddle::application::services::Claims;
use huddle::domain::ConnectionId;
use huddle::infrastructure::memory::{InMemoryStore, DEFAULT_SERVER_ID, GENERAL_CHANNEL_ID};
use huddle::presentation::websocket::MAX_BACKLOG;

use crate::common::{test_settings, TestApp};

const SECRET: &str = "integration-secret-that-is-long-enough";

fn signed_token(sub: i64) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: sub.to_string(),
        exp: (now + chrono::Duration::minutes(5)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_hello_is_first_event() {
    let app = TestApp::new();
    let mut client = app.connect();

    let first = client.next().await.unwrap();

    assert_eq!(first["event"], "hello");
    assert_eq!(first["data"]["heartbeatInterval"], 41250);
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged_before_authentication() {
    let app = TestApp::new();
    let mut client = app.connect();
    client.expect("hello").await;

    client.send(json!({"event": "heartbeat"}));

    let ack = client.next().await.unwrap();
    assert_eq!(ack["event"], "heartbeat:ack");
}

#[tokio::test]
async fn test_authenticate_sends_ready() {
    let app = TestApp::new();
    let mut client = app.connect();
    client.expect("hello").await;

    client.authenticate(7, "alice");

    let ready = client.expect("ready").await;
    assert_eq!(ready["sessionId"], client.conn.to_string());
    assert_eq!(ready["user"]["username"], "alice");
    assert_eq!(ready["user"]["status"], "online");
    assert_eq!(ready["serverIds"], json!([DEFAULT_SERVER_ID]));
    assert!(app.store.user(7).is_some());
}

#[tokio::test]
async fn test_events_before_authentication_are_rejected() {
    let app = TestApp::new();
    let mut client = app.connect();
    client.expect("hello").await;

    client.say(10, "hello?");

    let error = client.expect("error").await;
    assert_eq!(error["event"], "message:send");
    assert_eq!(error["code"], "unauthenticated");
    assert_eq!(app.store.message_count(), 0);
}

#[tokio::test]
async fn test_second_identity_on_one_connection_is_rejected() {
    let app = TestApp::new();
    let mut client = app.login(1, "alice").await;

    client.authenticate(2, "bob");
    let error = client.expect("error").await;
    assert_eq!(error["code"], "already_authenticated");

    client.authenticate(1, "alice");
    let ready = client.expect("ready").await;
    assert_eq!(ready["user"]["id"], 1);
}

#[tokio::test]
async fn test_closed_store_rejects_unknown_user() {
    let app = TestApp::with_store(InMemoryStore::closed());
    let mut client = app.connect();
    client.expect("hello").await;

    client.authenticate(42, "ghost");

    let error = client.expect("error").await;
    assert_eq!(error["event"], "authenticate");
    assert_eq!(error["code"], "not_found");

    let stats = app.gateway().stats().await.unwrap();
    assert_eq!(stats.authenticated, 0);
}

#[tokio::test]
async fn test_invalid_payload_is_a_validation_error() {
    let app = TestApp::new();
    let mut client = app.connect();
    client.expect("hello").await;

    client.authenticate(0, "nobody");

    let error = client.expect("error").await;
    assert_eq!(error["code"], "validation");
}

#[tokio::test]
async fn test_token_required_when_secret_configured() {
    let mut settings = test_settings();
    settings.auth.jwt_secret = Some(SECRET.into());
    let app = TestApp::build(settings, InMemoryStore::new());

    let mut without = app.connect();
    without.expect("hello").await;
    without.authenticate(5, "eve");
    assert_eq!(without.expect("error").await["code"], "invalid_token");

    let mut with = app.connect();
    with.expect("hello").await;
    with.emit(
        "authenticate",
        json!({"userId": 5, "username": "eve", "token": signed_token(5)}),
    );
    assert_eq!(with.expect("ready").await["user"]["id"], 5);

    let mut impostor = app.connect();
    impostor.expect("hello").await;
    impostor.emit(
        "authenticate",
        json!({"userId": 6, "username": "mallory", "token": signed_token(5)}),
    );
    assert_eq!(impostor.expect("error").await["code"], "invalid_token");
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let app = TestApp::new();
    let mut client = app.connect();
    client.expect("hello").await;

    app.gateway().malformed(client.conn, "expected value at line 1 column 1");

    let error = client.expect("error").await;
    assert_eq!(error["event"], "unknown");
    assert_eq!(error["code"], "malformed");

    client.send(json!({"event": "heartbeat"}));
    client.expect("heartbeat:ack").await;
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let app = TestApp::new();
    let mut client = app.login(1, "alice").await;

    client.disconnect();
    client.disconnect();
    app.gateway().disconnect(ConnectionId::new());

    assert!(client.closed().await);
    let stats = app.gateway().stats().await.unwrap();
    assert_eq!(stats.connections, 0);
    assert_eq!(stats.online_users, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unauthenticated_connection_times_out() {
    let app = TestApp::new();
    let mut client = app.connect();
    client.expect("hello").await;

    tokio::time::sleep(Duration::from_secs(31)).await;

    let error = client.expect("error").await;
    assert_eq!(error["event"], "authenticate");
    assert!(client.closed().await);
}

#[tokio::test(start_paused = true)]
async fn test_authenticated_connection_survives_identify_deadline() {
    let app = TestApp::new();
    let mut client = app.login(1, "alice").await;

    tokio::time::sleep(Duration::from_secs(31)).await;

    client.send(json!({"event": "heartbeat"}));
    client.expect("heartbeat:ack").await;
}

/// Events queued behind a running job are bounded per connection
#[tokio::test]
async fn test_backlog_overflow_is_rejected() {
    let app = TestApp::new();
    let mut alice = app.login(1, "alice").await;
    let burst = MAX_BACKLOG + 10;

    for i in 0..burst {
        alice.say(GENERAL_CHANNEL_ID, &format!("message {}", i));
    }

    let errors: Vec<_> = alice
        .drain()
        .await
        .into_iter()
        .filter(|e| e["event"] == "error")
        .map(|e| e["data"].clone())
        .collect();
    assert_eq!(errors.len(), burst - 1 - MAX_BACKLOG);
    assert!(errors
        .iter()
        .all(|e| e["code"] == "validation" && e["event"] == "message:send"));
    assert_eq!(app.store.message_count(), MAX_BACKLOG + 1);

    alice.send(json!({"event": "heartbeat"}));
    alice.expect("heartbeat:ack").await;
}
