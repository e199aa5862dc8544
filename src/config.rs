use std::fmt::{self, Display};

use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    constants::DEFAULT_MAX_CONNECTIONS,
    error::{CacheError, QueryError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl ConfigError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::new("DATABASE_URL is not set"))?;

        let redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::new("DATABASE_MAX_CONNECTIONS must be a positive integer"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            redis_url,
            max_connections,
        })
    }

    pub async fn connect_database(&self) -> Result<Pool<Postgres>, QueryError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await?;

        log::info!("> Connected to database ({} connections)", self.max_connections);
        Ok(pool)
    }

    /// `None` when no cache is configured.
    pub async fn connect_cache(&self) -> Result<Option<MultiplexedConnection>, CacheError> {
        let url = match &self.redis_url {
            Some(url) => url,
            None => return Ok(None),
        };

        let client = redis::Client::open(url.as_str())?;
        let connection = client.get_multiplexed_tokio_connection().await?;

        log::info!("> Connected to cache");
        Ok(Some(connection))
    }
}
