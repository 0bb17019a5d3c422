//! Server configuration
//!
//! Environment-driven with CLI overrides; every knob has a default that
//! works against a local stack.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use moneybee_db::DatabaseConfig;

/// Server binding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address: {}", e))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    pub level: String,
    /// json or pretty
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// API surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub enable_cors: bool,
    pub enable_trace: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            enable_cors: false,
            enable_trace: true,
        }
    }
}

/// Full server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub logging: LoggingConfig,
    pub api: ApiSettings,
    pub database: DatabaseConfig,
}

impl ServerConfig {
    /// Assemble from the environment
    pub fn load() -> Self {
        let defaults_server = ServerSettings::default();
        Self {
            server: ServerSettings {
                host: std::env::var("MONEYBEE_HOST").unwrap_or(defaults_server.host),
                port: std::env::var("MONEYBEE_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults_server.port),
            },
            logging: LoggingConfig::default(),
            api: ApiSettings {
                enable_cors: std::env::var("MONEYBEE_ENABLE_CORS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
                enable_trace: true,
            },
            database: DatabaseConfig::default(),
        }
    }
}
