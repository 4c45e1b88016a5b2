pub mod memory;
pub mod postgres;
pub mod records;

use crate::config::DatabaseConfig;
use crate::domain::device::{DeviceFilter, DeviceRecord, NewDevice};
use crate::error::Result;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;

pub use memory::InMemoryDeviceStore;
pub use postgres::PgDeviceStore;

pub type DbPool = Pool<Postgres>;

/// Keyed record store holding one [`DeviceRecord`] per token.
///
/// Implementations must make `upsert` and `delete` atomic per token.
#[async_trait]
pub trait DeviceStore: Send + Sync + std::fmt::Debug {
    /// Inserts the device or replaces owner and platform of an existing token.
    async fn upsert(&self, device: NewDevice) -> Result<DeviceRecord>;

    /// Returns the devices matching `filter`, oldest registration first.
    async fn list(&self, filter: &DeviceFilter) -> Result<Vec<DeviceRecord>>;

    /// Removes the token. Returns whether a record existed.
    async fn delete(&self, token: &str) -> Result<bool>;

    /// Checks that the backing store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// Connects to Postgres, retrying with exponential backoff while the database comes up.
///
/// # Errors
/// Returns `sqlx::Error` once all attempts fail.
pub async fn init_pool(url: &str, config: &DatabaseConfig) -> std::result::Result<DbPool, sqlx::Error> {
    let retry_strategy = ExponentialBuilder::default()
        .with_max_delay(Duration::from_secs(config.max_backoff_secs))
        .with_max_times(config.connect_attempts);

    (|| async move {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(url)
            .await
    })
    .retry(retry_strategy)
    .notify(|e, duration| {
        tracing::warn!(error = %e, retry_in = ?duration, "Database connection failed, retrying");
    })
    .await
}

/// Applies the embedded schema migrations.
///
/// # Errors
/// Returns an error if a migration fails to apply.
pub async fn run_migrations(pool: &DbPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}
