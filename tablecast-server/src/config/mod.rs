//! Configuration module for tablecast-server.
//!
//! Handles loading configuration from an optional TOML file, environment
//! variables and CLI arguments, in that order of precedence (last wins).

pub mod file;

use crate::config::file::FileConfig;
use axum::http::HeaderValue;
use sqlx::postgres::PgConnectOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tablecast_core::config::{ListenerConfig, WebhookConfig};
use tablecast_core::utils::backoff::Backoff;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid value in environment variable {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error("invalid database url: {0}")]
    InvalidDatabaseUrl(#[source] sqlx::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("no database configured: set DATABASE_URL, DB_HOST or [database] in the config file")]
    MissingDatabase,
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub cors: CorsOrigins,
}

/// Origins accepted by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<HeaderValue>),
}

/// Database connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub connect_options: PgConnectOptions,
    pub max_connections: u32,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub listener: ListenerConfig,
    pub webhook: WebhookConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if it exists
    /// 2. Apply environment variables
    /// 3. Apply CLI overrides
    /// 4. Validate and build the runtime configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = self.read_file()?;
        file_config.apply_env(|var| std::env::var(var).ok())?;
        self.build(file_config)
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn read_file(&self) -> Result<FileConfig, ConfigError> {
        match std::fs::read_to_string(&self.config_path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults and environment"
                );
                Ok(FileConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn build(&self, mut file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        let FileConfig {
            server,
            database,
            listener,
            webhook,
        } = file_config;

        if listener.channel.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "listener channel must not be empty".to_string(),
            ));
        }

        Ok(LoadedConfig {
            server: ServerConfig {
                listen: server.listen,
                cors: parse_cors_origins(&server.cors_origins)?,
            },
            database: DatabaseConfig {
                connect_options: connect_options(&database)?,
                max_connections: database.max_connections.max(1),
            },
            listener: ListenerConfig {
                channel: listener.channel,
                backoff: Backoff::new(
                    Duration::from_millis(listener.reconnect_initial_ms),
                    Duration::from_millis(listener.reconnect_max_ms),
                ),
            },
            webhook: WebhookConfig {
                url: webhook.url,
                timeout: Duration::from_secs(webhook.timeout_secs.max(1)),
                mode: webhook.mode,
                max_in_flight: webhook.max_in_flight.max(1),
            },
        })
    }
}

fn connect_options(database: &file::DatabaseConfig) -> Result<PgConnectOptions, ConfigError> {
    if let Some(url) = &database.url {
        return PgConnectOptions::from_str(url).map_err(ConfigError::InvalidDatabaseUrl);
    }

    let Some(host) = &database.host else {
        return Err(ConfigError::MissingDatabase);
    };

    let mut options = PgConnectOptions::new().host(host);
    if let Some(port) = database.port {
        options = options.port(port);
    }
    if let Some(user) = &database.user {
        options = options.username(user);
    }
    if let Some(password) = &database.password {
        options = options.password(password);
    }
    if let Some(name) = &database.database {
        options = options.database(name);
    }
    Ok(options)
}

fn parse_cors_origins(origins: &[String]) -> Result<CorsOrigins, ConfigError> {
    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return Ok(CorsOrigins::Any);
    }
    origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| {
                ConfigError::ValidationError(format!("invalid CORS origin: {origin:?}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(CorsOrigins::List)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> ConfigLoader {
        ConfigLoader::new("/nonexistent/tablecast.toml", None)
    }

    #[test]
    fn test_missing_database_is_fatal() {
        let err = loader().build(FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabase));
    }

    #[test]
    fn test_missing_webhook_is_not_fatal() {
        let mut config = FileConfig::default();
        config.database.url = Some("postgres://relay:pw@localhost:5432/shop".to_string());
        let loaded = loader().build(config).unwrap();
        assert!(loaded.webhook.url.is_none());
        assert_eq!(loaded.listener.channel, "evento_cambio");
        assert_eq!(loaded.server.cors, CorsOrigins::Any);
    }

    #[test]
    fn test_database_parts() {
        let mut config = FileConfig::default();
        config.database.host = Some("db.internal".to_string());
        config.database.port = Some(5433);
        config.database.database = Some("shop".to_string());
        let loaded = loader().build(config).unwrap();
        let options = &loaded.database.connect_options;
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_database(), Some("shop"));
    }

    #[test]
    fn test_invalid_database_url() {
        let mut config = FileConfig::default();
        config.database.url = Some("postgres://relay@localhost:notaport/shop".to_string());
        assert!(matches!(
            loader().build(config),
            Err(ConfigError::InvalidDatabaseUrl(_))
        ));
    }

    #[test]
    fn test_listen_override_wins() {
        let mut config = FileConfig::default();
        config.database.host = Some("db".to_string());
        let addr: SocketAddr = "127.0.0.1:8081".parse().unwrap();
        let loaded = ConfigLoader::new("unused.toml", Some(addr))
            .build(config)
            .unwrap();
        assert_eq!(loaded.server.listen, addr);
    }

    #[test]
    fn test_cors_allow_list() {
        let origins = vec![
            "https://a.example".to_string(),
            "https://b.example".to_string(),
        ];
        match parse_cors_origins(&origins).unwrap() {
            CorsOrigins::List(list) => assert_eq!(list.len(), 2),
            CorsOrigins::Any => panic!("expected an allow-list"),
        }
        assert_eq!(
            parse_cors_origins(&["*".to_string()]).unwrap(),
            CorsOrigins::Any
        );
        assert!(parse_cors_origins(&["bad\norigin".to_string()]).is_err());
    }

    #[test]
    fn test_read_missing_file_falls_back_to_defaults() {
        let config = loader().read_file().unwrap();
        assert_eq!(config.listener.channel, "evento_cambio");
    }
}
