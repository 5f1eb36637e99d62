//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Timeout of a single location lookup performed while resolving
    /// suggestions.
    #[default(time::Duration::from_secs(2))]
    #[serde(with = "humantime_serde")]
    pub lookup_timeout: time::Duration,

    /// Default number of location suggestions.
    #[default(10)]
    pub suggestion_limit: usize,

    /// Maximum number of location suggestions.
    #[default(50)]
    pub max_suggestion_limit: usize,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            lookup_timeout,
            suggestion_limit,
            max_suggestion_limit,
        } = value;
        Self {
            lookup_timeout,
            suggestion_limit,
            max_suggestion_limit,
        }
    }
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,

    /// Maximum number of pooled connections.
    #[default(16)]
    pub pool_size: usize,

    /// Maximum time to wait for a pooled connection.
    #[default(time::Duration::from_secs(5))]
    #[serde(with = "humantime_serde")]
    pub wait_timeout: time::Duration,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        use service::infra::postgres::{PoolConfig, Timeouts};

        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
            pool_size,
            wait_timeout,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            pool: Some(PoolConfig {
                max_size: pool_size,
                timeouts: Timeouts {
                    wait: Some(wait_timeout),
                    ..Timeouts::default()
                },
                ..PoolConfig::default()
            }),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::{Config, Postgres};

    #[test]
    fn defaults_without_file() {
        let config = Config::new("does-not-exist.toml").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.service.lookup_timeout, Duration::from_secs(2));
        assert_eq!(config.service.suggestion_limit, 10);
        assert_eq!(config.service.max_suggestion_limit, 50);
    }

    #[test]
    fn postgres_bounds_pool_wait() {
        let conf = service::infra::postgres::Config::from(Postgres {
            pool_size: 4,
            wait_timeout: Duration::from_millis(1500),
            ..Postgres::default()
        });
        let pool = conf.pool.unwrap();
        assert_eq!(pool.max_size, 4);
        assert_eq!(pool.timeouts.wait, Some(Duration::from_millis(1500)));
        assert_eq!(conf.dbname.as_deref(), Some("postgres"));
    }
}
