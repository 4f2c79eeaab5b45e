//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present).

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    /// `None` runs the gateway against in-memory collaborators
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    pub hub: HubConfig,
    pub snowflake: SnowflakeConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Listener configuration for the gateway
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// JWT configuration (verification only)
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Allowed clock skew in seconds when checking `exp`
    pub leeway: u64,
}

/// Snowflake ID generator configuration
#[derive(Debug, Clone, Default)]
pub struct SnowflakeConfig {
    pub worker_id: u16,
}

/// Hub, connection and liveness tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// How often the writer pump sends a ping
    pub heartbeat_interval: Duration,
    /// How long a ping may stay unanswered before the peer is considered dead
    pub pong_timeout: Duration,
    /// Per-connection outbound queue size; overflowing it closes the connection
    pub outbound_queue_capacity: usize,
    /// Maximum live connections per room, `0` for unbounded
    pub max_room_size: usize,
    /// Size of the hub's command queue
    pub command_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(default_heartbeat_interval_ms()),
            pong_timeout: Duration::from_millis(default_pong_timeout_ms()),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            max_room_size: 0,
            command_buffer: default_command_buffer(),
        }
    }
}

impl HubConfig {
    /// Check the invariants the hub relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "OUTBOUND_QUEUE_CAPACITY",
                "must be at least 1".to_string(),
            ));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "HEARTBEAT_INTERVAL_MS",
                "must be greater than 0".to_string(),
            ));
        }
        if self.pong_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "PONG_TIMEOUT_MS",
                "must be greater than 0".to_string(),
            ));
        }
        if self.command_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "HUB_COMMAND_BUFFER",
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a room already holding `members` connections can take another
    #[must_use]
    pub fn room_has_capacity(&self, members: usize) -> bool {
        self.max_room_size == 0 || members < self.max_room_size
    }
}

// Default value functions
fn default_app_name() -> String {
    "relay-gateway".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_pong_timeout_ms() -> u64 {
    10_000
}

fn default_outbound_queue_capacity() -> usize {
    256
}

fn default_command_buffer() -> usize {
    1024
}

fn default_jwt_leeway() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or a value is invalid
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hub = HubConfig {
            heartbeat_interval: Duration::from_millis(
                parse_or(&lookup, "HEARTBEAT_INTERVAL_MS", default_heartbeat_interval_ms())?,
            ),
            pong_timeout: Duration::from_millis(parse_or(
                &lookup,
                "PONG_TIMEOUT_MS",
                default_pong_timeout_ms(),
            )?),
            outbound_queue_capacity: parse_or(
                &lookup,
                "OUTBOUND_QUEUE_CAPACITY",
                default_outbound_queue_capacity(),
            )?,
            max_room_size: parse_or(&lookup, "MAX_ROOM_SIZE", 0)?,
            command_buffer: parse_or(&lookup, "HUB_COMMAND_BUFFER", default_command_buffer())?,
        };
        hub.validate()?;

        let database = match lookup("DATABASE_URL") {
            Some(url) if !url.trim().is_empty() => Some(DatabaseConfig {
                url,
                max_connections: parse_or(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    default_max_connections(),
                )?,
                min_connections: parse_or(
                    &lookup,
                    "DATABASE_MIN_CONNECTIONS",
                    default_min_connections(),
                )?,
            }),
            _ => None,
        };

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .as_deref()
                    .and_then(Environment::parse)
                    .unwrap_or_default(),
            },
            gateway: ServerConfig {
                host: lookup("GATEWAY_HOST").unwrap_or_else(default_host),
                port: lookup("GATEWAY_PORT")
                    .ok_or(ConfigError::MissingVar("GATEWAY_PORT"))?
                    .parse()
                    .map_err(|e| ConfigError::InvalidValue("GATEWAY_PORT", format!("{e}")))?,
            },
            database,
            jwt: JwtConfig {
                secret: lookup("JWT_SECRET").ok_or(ConfigError::MissingVar("JWT_SECRET"))?,
                leeway: parse_or(&lookup, "JWT_LEEWAY_SECS", default_jwt_leeway())?,
            },
            hub,
            snowflake: SnowflakeConfig {
                worker_id: parse_or(&lookup, "SNOWFLAKE_WORKER_ID", 0)?,
            },
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
/// A set-but-unparseable value is an error rather than a silent default.
fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(key, format!("{raw:?}: {e}"))),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
