//! # Huddle
//!
//! Application entry point. Initializes logging, loads configuration and
//! runs the gateway and signaling listeners.

use anyhow::Result;
use tracing::info;

use huddle::config::Settings;
use huddle::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    huddle::telemetry::init_tracing();

    info!("Starting Huddle...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        gateway = %settings.server_addr(),
        signaling = %settings.signaling_addr(),
        environment = %settings.environment,
        token_auth = settings.auth.jwt_secret.is_some(),
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
