//! Common test utilities and helpers

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tower::ServiceExt;

use huddle::config::Settings;
use huddle::domain::ConnectionId;
use huddle::infrastructure::memory::InMemoryStore;
use huddle::presentation::http::create_router;
use huddle::presentation::websocket::{ClientEvent, GatewayHandle, ServerEvent};
use huddle::startup::AppState;

/// How long to wait for an expected event
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

/// Silence that counts as "nothing more is coming"
pub const QUIET_PERIOD: Duration = Duration::from_millis(150);

/// Test application wrapper
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    /// Open-registration store with the seeded default server.
    pub fn new() -> Self {
        Self::with_store(InMemoryStore::new())
    }

    pub fn with_store(store: InMemoryStore) -> Self {
        Self::build(test_settings(), store)
    }

    pub fn build(settings: Settings, store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        let state = AppState::new(settings, store.clone());
        let router = create_router(state.clone());
        Self {
            router,
            state,
            store,
        }
    }

    pub fn gateway(&self) -> &GatewayHandle {
        &self.state.gateway
    }

    /// Open a gateway connection without authenticating.
    pub fn connect(&self) -> GatewayClient {
        let (conn, events) = self.state.gateway.connect();
        GatewayClient {
            conn,
            gateway: self.state.gateway.clone(),
            events,
        }
    }

    /// Connect, authenticate and consume `hello` and `ready`.
    pub async fn login(&self, user_id: i64, username: &str) -> GatewayClient {
        let mut client = self.connect();
        client.expect("hello").await;
        client.authenticate(user_id, username);
        let ready = client.expect("ready").await;
        assert_eq!(ready["user"]["id"], user_id);
        client
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

/// Defaults without link previews, so no test reaches the network.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.link_preview.enabled = false;
    settings
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A gateway connection driven directly through the handle.
pub struct GatewayClient {
    pub conn: ConnectionId,
    gateway: GatewayHandle,
    events: UnboundedReceiver<ServerEvent>,
}

impl GatewayClient {
    /// Submit a raw `{"event", "data"}` frame.
    pub fn send(&self, frame: Value) {
        let event: ClientEvent = serde_json::from_value(frame).expect("valid client frame");
        self.gateway.submit(self.conn, event);
    }

    pub fn emit(&self, name: &str, data: Value) {
        self.send(json!({ "event": name, "data": data }));
    }

    pub fn authenticate(&self, user_id: i64, username: &str) {
        self.emit(
            "authenticate",
            json!({ "userId": user_id, "username": username }),
        );
    }

    pub fn join(&self, channel_id: i64) {
        self.emit("user:join", json!({ "channelId": channel_id }));
    }

    pub fn say(&self, channel_id: i64, content: &str) {
        self.emit(
            "message:send",
            json!({ "channelId": channel_id, "content": content }),
        );
    }

    /// Next event as wire JSON. `None` once the gateway dropped the connection.
    pub async fn next(&mut self) -> Option<Value> {
        timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for an event")
            .map(to_wire)
    }

    /// Skip events until one named `name` arrives and return its data.
    pub async fn expect(&mut self, name: &str) -> Value {
        loop {
            let event = self
                .next()
                .await
                .unwrap_or_else(|| panic!("connection closed while waiting for {}", name));
            if event["event"] == name {
                return event["data"].clone();
            }
        }
    }

    /// Every event delivered until the connection goes quiet.
    pub async fn drain(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = timeout(QUIET_PERIOD, self.events.recv()).await {
            events.push(to_wire(event));
        }
        events
    }

    pub async fn drain_named(&mut self, name: &str) -> Vec<Value> {
        self.drain()
            .await
            .into_iter()
            .filter(|e| e["event"] == name)
            .map(|e| e["data"].clone())
            .collect()
    }

    pub async fn assert_none(&mut self, name: &str) {
        let seen = self.drain_named(name).await;
        assert!(seen.is_empty(), "unexpected {} events: {:?}", name, seen);
    }

    /// Wait for the gateway to drop this connection.
    pub async fn closed(&mut self) -> bool {
        loop {
            match timeout(EVENT_TIMEOUT, self.events.recv()).await {
                Ok(None) => return true,
                Ok(Some(_)) => continue,
                Err(_) => return false,
            }
        }
    }

    pub fn disconnect(&self) {
        self.gateway.disconnect(self.conn);
    }
}

fn to_wire(event: ServerEvent) -> Value {
    serde_json::to_value(event).expect("server events serialize")
}
