//! Service configuration
//!
//! Layered with the `config` crate, later sources winning:
//! built-in defaults, `config/default`, `config/{APP_ENV}`, `config/local`,
//! then `APP__SECTION__KEY` environment variables.

use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEV_JWT_SECRET: &str = "mcr-local-development-secret";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Whole-request deadline, including the store round trip
    pub request_timeout_secs: u64,
    /// Largest accepted JSON body; autosave batches are small, entity
    /// payloads and full-page updates are the upper bound
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Postgres connection pool used by the `postgres` store backend
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    /// Apply pending SQL migrations from `migrations_dir` at startup
    pub run_migrations: bool,
    pub migrations_dir: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/mcr".to_string(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout_secs: 10,
            idle_timeout_secs: 300,
            run_migrations: false,
            migrations_dir: "migrations".to_string(),
        }
    }
}

/// Which report store backs the service
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// Process-local; reports do not survive a restart
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    pub jwt_secret: Option<String>,
    /// Lifetime of tokens minted by this service (tests, local tooling)
    pub jwt_expiration_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Level name or a full `EnvFilter` directive; `RUST_LOG` overrides it
    pub log_level: String,
    pub json_logging: bool,
    /// Prometheus listener port, 0 disables the exporter
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logging: true,
            metrics_port: 9090,
        }
    }
}

/// Global token bucket in front of every route
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 50,
            burst: 100,
        }
    }
}

fn env_source() -> Environment {
    // APP__SERVER__PORT=8081, APP__STORE__BACKEND=memory
    Environment::with_prefix("APP")
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    /// Load from the config directory and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Self::build(
            Config::builder()
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name(&format!("config/{}", env)).required(false))
                .add_source(File::with_name("config/local").required(false))
                .add_source(env_source()),
        )
    }

    /// Parse a TOML document; unset keys keep their defaults
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::from_str(raw, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Secret used to verify identity tokens
    pub fn jwt_secret(&self) -> &str {
        match self.auth.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("auth.jwt_secret is not set, using the development secret");
                DEV_JWT_SECRET
            }
        }
    }
}
