//! Configuration management for the Agora engine
//!
//! Strongly-typed configuration read from environment variables, with
//! validation and defaults suited to local development.
//!
//! # Example
//! ```no_run
//! use agora::Config;
//! let config = Config::from_env().expect("failed to load config");
//! println!("listening on {}:{}", config.api.host, config.api.port);
//! ```

use crate::error::{Error, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,
    /// API server configuration
    pub api: ApiConfig,
    /// Feed assembly and store behaviour
    pub feed: FeedConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Minimum connections to keep open
    pub min_connections: u32,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Idle timeout for connections
    pub idle_timeout: Duration,
    /// Maximum lifetime for connections
    pub max_lifetime: Duration,
    /// Run embedded migrations on startup
    pub run_migrations: bool,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to
    pub host: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Maximum request body size
    pub max_body_size: usize,
    /// Enable CORS
    pub cors_enabled: bool,
    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

/// Feed and store behaviour
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Upper bound on every store call
    pub query_timeout: Duration,
    /// Let blocked items through the discovery tier
    pub discovery_include_blocked: bool,
    /// Skip a failing edge instead of failing the whole feed
    pub partial_on_edge_error: bool,
    /// Address for the Prometheus exporter, when the `prometheus` feature is on
    pub metrics_addr: Option<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_millis(5000),
            discovery_include_blocked: false,
            partial_on_edge_error: false,
            metrics_addr: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Platforms that mount secrets as files point FFOLDER at a directory:
        // each file name is a variable name and its contents the value.
        if let Ok(folder) = std::env::var("FFOLDER") {
            load_env_folder(&folder);
        } else {
            dotenvy::dotenv().ok();
        }

        let config = Self {
            database: DatabaseConfig::from_env()?,
            api: ApiConfig::from_env()?,
            feed: FeedConfig::from_env()?,
        };

        config.validate()?;
        config.log_summary();

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(Error::InvalidConfig {
                key: "DATABASE_URL",
                message: "database URL cannot be empty".into(),
            });
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(Error::InvalidConfig {
                key: "DB_MAX_CONNECTIONS",
                message: "max_connections must be >= min_connections".into(),
            });
        }

        if self.feed.query_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                key: "STORE_QUERY_TIMEOUT_MS",
                message: "query timeout must be greater than zero".into(),
            });
        }

        Ok(())
    }

    /// Log configuration summary (without sensitive data)
    fn log_summary(&self) {
        info!("Configuration loaded:");
        info!("  Database:");
        info!("    URL: {}", mask_url(&self.database.url));
        info!(
            "    Pool Size: {}-{}",
            self.database.min_connections, self.database.max_connections
        );
        info!("  API:");
        info!("    Listening on: {}:{}", self.api.host, self.api.port);
        info!("  Feed:");
        info!("    Store query timeout: {:?}", self.feed.query_timeout);
        info!(
            "    Discovery includes blocked: {}",
            self.feed.discovery_include_blocked
        );
        info!(
            "    Partial feed on edge error: {}",
            self.feed.partial_on_edge_error
        );
    }
}

fn load_env_folder(folder: &str) {
    let path = std::path::Path::new(folder);
    if !path.is_dir() {
        warn!("FFOLDER {} is not a directory, ignoring", folder);
        return;
    }

    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Failed to read FFOLDER {}: {}", folder, err);
            return;
        }
    };

    for entry in entries.flatten() {
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if let Ok(contents) = std::fs::read_to_string(&file_path) {
            // Values already in the environment win
            if std::env::var(&name).is_err() {
                std::env::set_var(&name, contents.trim());
            }
        }
    }
    info!("Loaded configuration from FFOLDER={}", folder);
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let url = get_env("DATABASE_URL").unwrap_or_else(|_| {
            let user = std::env::var("USER").unwrap_or_else(|_| "postgres".to_string());
            format!("postgres://{}@localhost/agora_dev", user)
        });

        Ok(Self {
            url,
            max_connections: get_env_or("DB_MAX_CONNECTIONS", "20").parse().unwrap_or(20),
            min_connections: get_env_or("DB_MIN_CONNECTIONS", "2").parse().unwrap_or(2),
            connect_timeout: Duration::from_secs(
                get_env_or("DB_CONNECT_TIMEOUT_SECS", "30")
                    .parse()
                    .unwrap_or(30),
            ),
            idle_timeout: Duration::from_secs(
                get_env_or("DB_IDLE_TIMEOUT_SECS", "600")
                    .parse()
                    .unwrap_or(600),
            ),
            max_lifetime: Duration::from_secs(
                get_env_or("DB_MAX_LIFETIME_SECS", "3600")
                    .parse()
                    .unwrap_or(3600),
            ),
            run_migrations: get_env_or("DB_RUN_MIGRATIONS", "true")
                .parse()
                .unwrap_or(true),
        })
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            port: get_env_or("API_PORT", "8080").parse().unwrap_or(8080),
            host: get_env_or("API_HOST", "0.0.0.0"),
            request_timeout: Duration::from_secs(
                get_env_or("API_REQUEST_TIMEOUT_SECS", "30")
                    .parse()
                    .unwrap_or(30),
            ),
            max_body_size: get_env_or("API_MAX_BODY_SIZE", "1048576")
                .parse()
                .unwrap_or(1024 * 1024),
            cors_enabled: get_env_or("API_CORS_ENABLED", "true")
                .parse()
                .unwrap_or(true),
            cors_origins: get_env_or("API_CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
        })
    }
}

impl FeedConfig {
    fn from_env() -> Result<Self> {
        let metrics_addr = get_env_or("METRICS_ADDR", "");

        Ok(Self {
            query_timeout: Duration::from_millis(get_env_parsed_or(
                "STORE_QUERY_TIMEOUT_MS",
                5000u64,
            )?),
            discovery_include_blocked: get_env_parsed_or("FEED_DISCOVERY_INCLUDE_BLOCKED", false)?,
            partial_on_edge_error: get_env_parsed_or("FEED_PARTIAL_ON_EDGE_ERROR", false)?,
            metrics_addr: if metrics_addr.is_empty() {
                None
            } else {
                Some(metrics_addr)
            },
        })
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Get required environment variable
fn get_env(key: &'static str) -> Result<String> {
    std::env::var(key).map_err(|_| Error::MissingEnvVar { var: key })
}

/// Get environment variable with default
fn get_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an optional environment variable; a present but malformed value is an error
fn get_env_parsed_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|e: T::Err| Error::InvalidConfig {
            key,
            message: format!("Invalid value '{}': {}", value, e).into(),
        }),
        Err(_) => Ok(default),
    }
}

/// Mask sensitive parts of URL
fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            // A colon right after the scheme is not a password separator
            if url[colon_pos + 1..].starts_with("//") {
                return url.to_string();
            }
            let (before, after) = url.split_at(colon_pos + 1);
            let (_, rest) = after.split_at(at_pos - colon_pos - 1);
            return format!("{}****{}", before, rest);
        }
    }
    url.to_string()
}
