//! TOML file configuration structures.
//!
//! These structs directly map to the `tablecast.toml` file format. Every
//! section and field is optional; environment variables are layered on top
//! by [`FileConfig::apply_env`].

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tablecast_core::config::{
    DEFAULT_CHANNEL, DEFAULT_MAX_IN_FLIGHT, DEFAULT_WEBHOOK_TIMEOUT, DeliveryMode,
};
use url::Url;

use super::ConfigError;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub listener: ListenerConfig,
    pub webhook: WebhookConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:5000").
    pub listen: SocketAddr,
    /// Origins allowed by CORS. `"*"` allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

/// Database connection section.
///
/// Either `url` or `host` must end up set, from the file or the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    /// Pool size. The listener holds one connection.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            max_connections: 2,
        }
    }
}

/// Change listener section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub channel: String,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            reconnect_initial_ms: 500,
            reconnect_max_ms: 30_000,
        }
    }
}

/// Webhook forwarder section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: Option<Url>,
    pub timeout_secs: u64,
    pub mode: DeliveryMode,
    pub max_in_flight: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: DEFAULT_WEBHOOK_TIMEOUT.as_secs(),
            mode: DeliveryMode::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl FileConfig {
    /// Overlay environment variables on top of the file values.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = lookup("PORT") {
            let port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "PORT",
                reason: format!("{port:?} is not a port number"),
            })?;
            self.server.listen.set_port(port);
        }

        let db = &mut self.database;
        if let Some(url) = lookup("DATABASE_URL") {
            db.url = Some(url);
        }
        if let Some(host) = lookup("DB_HOST") {
            db.host = Some(host);
        }
        if let Some(port) = lookup("DB_PORT") {
            let port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "DB_PORT",
                reason: format!("{port:?} is not a port number"),
            })?;
            db.port = Some(port);
        }
        if let Some(user) = lookup("DB_USER") {
            db.user = Some(user);
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            db.password = Some(password);
        }
        if let Some(database) = lookup("DB_DATABASE") {
            db.database = Some(database);
        }

        if let Some(channel) = lookup("NOTIFY_CHANNEL") {
            self.listener.channel = channel;
        }

        // `N8N_WEBHOOK_URL` is the name older deployments use. A blank value
        // counts as unset.
        let webhook_var = ["WEBHOOK_URL", "N8N_WEBHOOK_URL"].into_iter().find_map(|var| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .map(|value| (var, value))
        });
        if let Some((var, value)) = webhook_var {
            let url = Url::parse(value.trim()).map_err(|e| ConfigError::InvalidEnv {
                var,
                reason: e.to_string(),
            })?;
            self.webhook.url = Some(url);
        }

        if let Some(origins) = lookup("CORS_ORIGIN") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(())
    }
}
