//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
    /// Allowed CORS origins: "*" or a comma-separated list
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl ServerConfig {
    /// Parse `cors_origin` into an explicit allow-list
    ///
    /// # Returns
    /// `None` when every origin is allowed ("*" or empty)
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        let trimmed = self.cors_origin.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return None;
        }

        Some(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        )
    }
}

fn default_cors_origin() -> String {
    "*".to_string()
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Directory holding `*.sql` migration units
    pub migrations_dir: PathBuf,
    /// Apply pending migrations before the server starts listening
    #[serde(default)]
    pub migrate_on_startup: bool,
}

/// API key authentication for write endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Expected `x-api-key` header value (16+ bytes)
    pub api_key: String,
}

/// Fixed-window rate limits, keyed by client IP
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window on every route
    pub max_requests: u32,
    /// Requests allowed per window on write routes
    pub write_max_requests: u32,
    /// Window length in seconds
    pub window_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (TWEETVAULT__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        let app_config = Self::load_layers()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Load only the database section
    ///
    /// Used by the migrate binary, which has no use for the API key.
    pub fn load_database() -> Result<DatabaseConfig, crate::error::AppError> {
        let app_config = Self::load_layers()?;
        if app_config.database.max_connections == 0 {
            return Err(crate::error::AppError::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        Ok(app_config.database)
    }

    fn load_layers() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors_origin", "*")?
            .set_default("database.path", "data/tweetvault.db")?
            .set_default("database.max_connections", 20)?
            .set_default("database.migrations_dir", "migrations")?
            .set_default("database.migrate_on_startup", false)?
            .set_default("auth.api_key", "")?
            .set_default("rate_limit.max_requests", 300)?
            .set_default("rate_limit.write_max_requests", 60)?
            .set_default("rate_limit.window_seconds", 60)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (TWEETVAULT__*)
            .add_source(
                Environment::with_prefix("TWEETVAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_API_KEY_BYTES: usize = 16;

        if self.auth.api_key.trim().len() < MIN_API_KEY_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.api_key must be at least {} bytes (required for write endpoints)",
                MIN_API_KEY_BYTES
            )));
        }

        if self.database.max_connections == 0 {
            return Err(crate::error::AppError::Config(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.max_requests == 0
            || self.rate_limit.write_max_requests == 0
            || self.rate_limit.window_seconds == 0
        {
            return Err(crate::error::AppError::Config(
                "rate_limit values must be greater than 0".to_string(),
            ));
        }

        if self.server.cors_origins().is_none() {
            tracing::warn!("CORS allows every origin");
        }

        Ok(())
    }
}
