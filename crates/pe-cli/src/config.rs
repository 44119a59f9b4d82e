//! Configuration loading for the Password Enhancements CLI.

use anyhow::{Context, Result};
use pe_api::middleware::StaticAllowedPaths;
use pe_api::{ApiServerConfig, NavigationLock, NavigationLockConfig, RouteTable};
use pe_observability::{LogFormat, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable overriding `database.url`.
pub const ENV_DATABASE_URL: &str = "PE_DATABASE_URL";
/// Environment variable overriding `server.port`.
pub const ENV_PORT: &str = "PE_PORT";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Route name to path overrides, layered on the built-in routes.
    #[serde(default)]
    pub routes: HashMap<String, String>,

    #[serde(default)]
    pub navigation_lock: NavigationLockSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Applies `PE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.database.url = url;
        }

        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .parse()
                .with_context(|| format!("{} is not a valid port: '{}'", ENV_PORT, port))?;
        }

        Ok(())
    }

    /// Builds the route table from the configured overrides.
    pub fn route_table(&self) -> Result<RouteTable> {
        RouteTable::from_overrides(&self.routes).context("Invalid route configuration")
    }

    /// Builds the navigation lock, including extra allowed paths.
    pub fn navigation_lock(&self) -> Result<NavigationLock> {
        let routes = Arc::new(self.route_table()?);
        let mut lock = NavigationLock::new(routes, self.navigation_lock.lock.clone())
            .context("Navigation lock routes do not resolve")?;

        if !self.navigation_lock.allowed_paths.is_empty() {
            lock = lock.with_provider(StaticAllowedPaths(
                self.navigation_lock.allowed_paths.clone(),
            ));
        }

        Ok(lock)
    }

    /// Builds the HTTP server configuration.
    pub fn api_server_config(&self) -> Result<ApiServerConfig> {
        let bind_address: SocketAddr = format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .context("Invalid bind address")?;

        Ok(ApiServerConfig {
            bind_address,
            shutdown_timeout: Duration::from_secs(self.server.shutdown_timeout_secs),
            session_cookie_name: self.server.session.cookie_name.clone(),
            session_expiry_seconds: self.server.session.expiry_seconds,
            session_secure: self.server.session.secure,
        })
    }

    /// Builds the logging configuration.
    pub fn logging_config(&self) -> Result<LoggingConfig> {
        LoggingConfig::from_settings(&self.logging.level, self.logging.format)
            .context("Invalid logging configuration")
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    #[serde(default)]
    pub session: SessionConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            session: SessionConfig::default(),
        }
    }
}

/// Session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Idle seconds before a session expires.
    #[serde(default = "default_session_expiry")]
    pub expiry_seconds: i64,

    /// Send the cookie over HTTPS only.
    #[serde(default)]
    pub secure: bool,
}

fn default_cookie_name() -> String {
    "pe_session".to_string()
}

fn default_session_expiry() -> i64 {
    8 * 60 * 60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            expiry_seconds: default_session_expiry(),
            secure: false,
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `sqlite:` or `postgres:` URL.
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "sqlite://password-enhancements.db?mode=rwc".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Navigation lock settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationLockSettings {
    #[serde(flatten)]
    pub lock: NavigationLockConfig,

    /// Extra paths a locked user may visit.
    #[serde(default)]
    pub allowed_paths: Vec<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
