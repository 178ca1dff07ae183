//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// HTTP/WebSocket gateway binding (host, port)
    pub server: ServerSettings,

    /// Media-signaling broker binding
    pub signaling: SignalingSettings,

    /// Gateway protocol limits and timers
    pub gateway: GatewaySettings,

    /// Token verification settings
    pub auth: AuthSettings,

    /// Link preview enrichment
    pub link_preview: LinkPreviewSettings,

    /// Snowflake ID generator settings
    pub snowflake: SnowflakeSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// Media-signaling broker configuration.
///
/// The broker runs on its own port and only maps peer ids to live
/// connections for the voice mesh.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalingSettings {
    pub host: String,
    pub port: u16,
    /// Mount path of the broker (default: "/peerjs")
    pub path: String,
}

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewaySettings {
    /// Heartbeat interval in milliseconds (default: 41250)
    pub heartbeat_interval_ms: u64,

    /// Seconds a connection may stay unauthenticated (default: 30)
    pub identify_timeout_secs: u64,

    /// Maximum WebSocket message size in bytes (default: 64KB)
    pub max_message_size: usize,

    /// Maximum WebSocket frame size in bytes (default: 16KB)
    pub max_frame_size: usize,

    /// Maximum message content length in characters (default: 2000)
    pub max_content_length: usize,

    /// Seconds before an unstopped typing indicator expires (default: 10)
    pub typing_timeout_secs: u64,
}

/// Token verification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthSettings {
    /// HS256 secret. When set, `authenticate` requires a valid token.
    pub jwt_secret: Option<String>,
}

/// Link preview configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkPreviewSettings {
    pub enabled: bool,

    /// Upper bound for one preview lookup in milliseconds
    pub timeout_ms: u64,
}

/// Snowflake ID generator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnowflakeSettings {
    /// Machine/worker ID (0-31)
    pub machine_id: u16,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsSettings {
    /// Allowed origins
    pub allowed_origins: Vec<String>,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".into(),
                port: 3001,
            },
            signaling: SignalingSettings::default(),
            gateway: GatewaySettings::default(),
            auth: AuthSettings::default(),
            link_preview: LinkPreviewSettings {
                enabled: true,
                timeout_ms: 1500,
            },
            snowflake: SnowflakeSettings { machine_id: 1 },
            cors: CorsSettings {
                allowed_origins: vec!["http://localhost:5173".into()],
            },
            environment: "development".into(),
        }
    }
}

impl Default for SignalingSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 9000,
            path: "/peerjs".into(),
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 41250,
            identify_timeout_secs: 30,
            max_message_size: 65536,
            max_frame_size: 16384,
            max_content_length: 2000,
            typing_timeout_secs: 10,
        }
    }
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. built-in defaults (`Settings::default()`)
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());
        let defaults = Settings {
            environment: environment.clone(),
            ..Settings::default()
        };

        Config::builder()
            .add_source(Config::try_from(&defaults)?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__GATEWAY__TYPING_TIMEOUT_SECS=5 -> gateway.typing_timeout_secs = 5
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("signaling.port", std::env::var("SIGNALING_PORT").ok())?
            .set_override_option("auth.jwt_secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option(
                "snowflake.machine_id",
                std::env::var("SNOWFLAKE_MACHINE_ID").ok(),
            )?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| settings.validate().map(|_| settings))
    }

    /// Reject configurations that would start a broken server.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(secret) = &self.auth.jwt_secret {
            if secret.len() < MIN_JWT_SECRET_LENGTH {
                return Err(ConfigError::Message(format!(
                    "JWT secret must be at least {} characters. Current length: {}",
                    MIN_JWT_SECRET_LENGTH,
                    secret.len()
                )));
            }
        }

        if self.server.port != 0 && self.server.port == self.signaling.port {
            return Err(ConfigError::Message(format!(
                "Gateway and signaling broker cannot share port {}",
                self.server.port
            )));
        }

        if !self.signaling.path.trim_end_matches('/').starts_with('/') {
            return Err(ConfigError::Message(
                "Signaling path must start with '/' and name a segment".into(),
            ));
        }

        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Get the full signaling broker address as a string.
    pub fn signaling_addr(&self) -> String {
        format!("{}:{}", self.signaling.host, self.signaling.port)
    }
}

impl GatewaySettings {
    pub fn heartbeat_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn typing_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.typing_timeout_secs)
    }

    pub fn identify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.identify_timeout_secs)
    }
}
