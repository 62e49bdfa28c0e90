//! Application configuration.

use serde::Deserialize;
use url::Url;

use crate::{AppError, AppResult};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Federation configuration.
    #[serde(default)]
    pub federation: FederationConfig,
    /// Notification fan-out configuration.
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Federation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Whether the federation endpoints are mounted.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Domain served by `WebFinger`. Defaults to the host of `server.url`.
    #[serde(default)]
    pub domain: Option<String>,
    /// Whether unknown remote actors are fetched over HTTP before being stored.
    #[serde(default = "default_true")]
    pub fetch_remote_actors: bool,
}

/// Notification fan-out configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Maximum number of fan-out jobs running at once.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            domain: None,
            fetch_remote_actors: true,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_max_concurrent_jobs() -> usize {
    4
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `MURMUR_ENV`)
    /// 3. Environment variables with `MURMUR_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("MURMUR_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MURMUR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Public base URL of this instance, without a trailing slash.
    #[must_use]
    pub fn server_url(&self) -> String {
        self.server.url.trim_end_matches('/').to_string()
    }

    /// Domain this instance answers `WebFinger` queries for.
    pub fn local_domain(&self) -> AppResult<String> {
        if let Some(ref domain) = self.federation.domain {
            return Ok(domain.to_lowercase());
        }

        let url = Url::parse(&self.server.url)
            .map_err(|e| AppError::Config(format!("Invalid server.url: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::Config("server.url has no host".to_string()))?;

        Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_lowercase(),
        })
    }
}
