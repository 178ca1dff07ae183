//! Application Startup
//!
//! Wires the services together and binds the gateway and signaling
//! listeners.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;

use crate::application::services::{AuthServiceImpl, DmService, DmServiceImpl, MessageServiceImpl};
use crate::config::Settings;
use crate::infrastructure::link_preview::UrlPreviewer;
use crate::infrastructure::memory::InMemoryStore;
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::signaling::{signaling_router, PeerBroker};
use crate::presentation::websocket::{Gateway, GatewayContext, GatewayHandle};
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub gateway: GatewayHandle,
    pub dms: Arc<dyn DmService>,
}

impl AppState {
    /// Build the services over `store` and start the gateway dispatcher.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(settings: Settings, store: Arc<InMemoryStore>) -> Self {
        let snowflake = Arc::new(SnowflakeGenerator::new(
            u64::from(settings.snowflake.machine_id),
            0u64, // Default node_id
        ));

        let preview_timeout = settings
            .link_preview
            .enabled
            .then(|| Duration::from_millis(settings.link_preview.timeout_ms));
        let messages = Arc::new(MessageServiceImpl::new(
            store.clone(),
            store.clone(),
            Arc::new(UrlPreviewer::new()),
            snowflake.clone(),
            settings.gateway.max_content_length,
            preview_timeout,
        ));
        let dms: Arc<dyn DmService> = Arc::new(DmServiceImpl::new(
            store.clone(),
            store.clone(),
            snowflake,
        ));
        let auth = Arc::new(AuthServiceImpl::new(settings.auth.jwt_secret.as_deref()));

        let gateway = Gateway::spawn(GatewayContext {
            users: store.clone(),
            servers: store.clone(),
            dm_rooms: store,
            messages,
            dms: dms.clone(),
            auth,
            settings: settings.gateway.clone(),
        });

        Self {
            settings: Arc::new(settings),
            gateway,
            dms,
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    signaling_listener: TcpListener,
    signaling_router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let store = Arc::new(InMemoryStore::new());
        tracing::info!("In-memory store seeded");

        let broker = Arc::new(PeerBroker::new());
        let signaling_router =
            signaling_router(broker, &settings.signaling.path, &settings.cors);

        let server_addr = settings.server_addr();
        let signaling_addr = settings.signaling_addr();

        let state = AppState::new(settings, store);
        let router = routes::create_router(state);

        let listener = TcpListener::bind(&server_addr)
            .await
            .with_context(|| format!("Failed to bind gateway listener on {}", server_addr))?;
        tracing::info!("Gateway listening on {}", listener.local_addr()?);

        let signaling_listener = TcpListener::bind(&signaling_addr)
            .await
            .with_context(|| format!("Failed to bind signaling listener on {}", signaling_addr))?;
        tracing::info!("Signaling broker listening on {}", signaling_listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            signaling_listener,
            signaling_router,
        })
    }

    /// Run both listeners until one of them fails
    pub async fn run_until_stopped(self) -> Result<()> {
        let gateway = axum::serve(self.listener, self.router).into_future();
        let signaling = axum::serve(self.signaling_listener, self.signaling_router).into_future();
        tokio::try_join!(gateway, signaling)?;
        Ok(())
    }

    /// Get the bound gateway address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Get the bound signaling broker address
    pub fn signaling_addr(&self) -> std::io::Result<SocketAddr> {
        self.signaling_listener.local_addr()
    }
}
