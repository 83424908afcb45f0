//! Metadata store connection pool management.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use jotbox_core::{Error, Result};

/// Default maximum number of connections in the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default time to wait for a free connection, in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Default idle timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

pub const ENV_MAX_CONNECTIONS: &str = "JOTBOX_DB_MAX_CONNECTIONS";
pub const ENV_ACQUIRE_TIMEOUT_SECS: &str = "JOTBOX_DB_ACQUIRE_TIMEOUT_SECS";

/// Pool configuration options.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections to maintain.
    pub min_connections: u32,
    /// How long a store call may wait for a connection before the store is
    /// considered unreachable.
    pub acquire_timeout: Duration,
    /// Idle connection timeout duration.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Read overrides from `JOTBOX_DB_MAX_CONNECTIONS` and
    /// `JOTBOX_DB_ACQUIRE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(ENV_MAX_CONNECTIONS) {
            config.max_connections = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be an integer, got {:?}", ENV_MAX_CONNECTIONS, raw))
            })?;
        }
        if let Ok(raw) = std::env::var(ENV_ACQUIRE_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be an integer, got {:?}",
                    ENV_ACQUIRE_TIMEOUT_SECS, raw
                ))
            })?;
            config.acquire_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
    }
}

/// Create a new PostgreSQL connection pool with default configuration.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Create a new PostgreSQL connection pool and establish the first connection.
///
/// An unreachable server surfaces as `Error::Connection`.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    info!(
        subsystem = "db",
        component = "pool",
        op = "create",
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        "Creating metadata store connection pool"
    );

    let pool = config.options().connect(database_url).await?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        pool_idle = pool.num_idle(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Metadata store connection pool established"
    );
    Ok(pool)
}

/// Create a pool that connects on first use instead of up front.
pub fn create_lazy_pool(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    Ok(config.options().connect_lazy(database_url)?)
}

/// Log current pool health metrics.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();

    debug!(
        subsystem = "db",
        component = "pool",
        op = "metrics",
        pool_size = size,
        pool_idle = idle,
        "Pool health check"
    );

    if idle == 0 && size > 0 {
        warn!(
            subsystem = "db",
            component = "pool",
            pool_size = size,
            "Connection pool has no idle connections, store calls may time out"
        );
    }
}
