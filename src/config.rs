//! # Configuration Management
//!
//! Configuration for the RCON server.
//!
//! The host hands a fully formed [`RconConfig`] to the server at startup; nothing
//! here is global or mutable after that point.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `load_or_create()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Security Considerations
//! - RCON is plaintext; bind to a private interface where possible
//! - An empty password disables the server entirely
//! - The per-connection idle timeout bounds how long a silent client holds a socket

use crate::error::{ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tracing::{warn, Level};

/// Default RCON listen port
pub const DEFAULT_PORT: u16 = 42425;

/// Default per-connection idle timeout, in minutes
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 20;

/// Largest response body sent in one packet; keeps each frame within client buffers
pub const RESPONSE_CHUNK_SIZE: usize = 4083;

/// Max accepted inbound frame, size prefix included
pub const MAX_PACKET_SIZE: usize = 4096;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "rcon.toml";

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RconConfig {
    /// Server-specific configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RconConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load `path`, or write a default configuration there if it does not exist.
    ///
    /// The default has an empty password, so a freshly created file leaves the
    /// server disabled until an operator sets one.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        let config = Self::default();
        config.save_to_file(path)?;
        warn!(
            path = %path.display(),
            "RCON config was not found and has been created with default values"
        );
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `RCON_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(ip) = std::env::var("RCON_IP") {
            let ip = ip
                .parse::<IpAddr>()
                .map_err(|e| ProtocolError::ConfigError(format!("Invalid RCON_IP '{ip}': {e}")))?;
            self.server.ip = Some(ip);
        }

        if let Ok(port) = std::env::var("RCON_PORT") {
            self.server.port = port.parse::<u16>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid RCON_PORT '{port}': {e}"))
            })?;
        }

        if let Ok(password) = std::env::var("RCON_PASSWORD") {
            self.server.password = password;
        }

        if let Ok(minutes) = std::env::var("RCON_TIMEOUT_MINUTES") {
            self.server.timeout_minutes = minutes.parse::<u64>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid RCON_TIMEOUT_MINUTES '{minutes}': {e}"))
            })?;
        }

        Ok(())
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind; `None` listens on every interface
    pub ip: Option<IpAddr>,

    /// Listen port
    pub port: u16,

    /// Shared secret clients authenticate with; empty disables the server
    pub password: String,

    /// Idle read timeout per connection, in minutes; 0 disables it
    pub timeout_minutes: u64,

    /// Largest inbound frame accepted, in bytes
    pub max_packet_size: usize,

    /// Largest response body per packet, in bytes
    pub response_chunk_size: usize,

    /// How long shutdown waits for in-flight sessions
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: None,
            port: DEFAULT_PORT,
            password: String::new(),
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            max_packet_size: MAX_PACKET_SIZE,
            response_chunk_size: RESPONSE_CHUNK_SIZE,
            shutdown_timeout: timeout::SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Address the listener binds
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(
            self.ip.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            self.port,
        )
    }

    /// Per-connection idle read timeout; `None` when `timeout_minutes` is 0
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.timeout_minutes > 0).then(|| Duration::from_secs(self.timeout_minutes * 60))
    }

    /// The server only runs with a password set
    pub fn is_enabled(&self) -> bool {
        !self.password.is_empty()
    }

    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.password.is_empty() {
            errors.push(
                "RCON password is empty - RCON will be unavailable until one is set".to_string(),
            );
        } else if self.password.contains('\0') {
            errors.push("RCON password cannot contain NUL characters".to_string());
        }

        // 0 disables the idle timeout
        if self.timeout_minutes > 24 * 60 {
            errors.push("Connection timeout too long (maximum: 1440 minutes)".to_string());
        }

        // Room for at least the size prefix, id, type and terminator
        if self.max_packet_size < 14 {
            errors.push("Max packet size too small (minimum: 14 bytes)".to_string());
        }

        if self.response_chunk_size == 0 {
            errors.push("Response chunk size must be greater than 0".to_string());
        } else if self.response_chunk_size > 1024 * 1024 {
            errors.push(format!(
                "Response chunk size too large: {} bytes (maximum: 1 MB)",
                self.response_chunk_size
            ));
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("source-rcon"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
