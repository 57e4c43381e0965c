//! PostgreSQL version store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};

use crate::migrate::config::{validate_identifier, MigrationConfig};
use crate::migrate::version_store::{StoreConnector, VersionRecord, VersionStore};
use crate::migrate::MigrateError;
use crate::store::StoreError;

/// Stored in place of a missing version when the record is dirty.
const NIL_VERSION: i64 = -1;

/// Version record kept in a single-row table.
#[derive(Debug, Clone)]
pub struct PgVersionStore {
    pool: PgPool,
    table: String,
}

impl PgVersionStore {
    /// `table` is interpolated into SQL, so it must be a plain identifier.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self, MigrateError> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self { pool, table })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn write_record(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        version: Option<i64>,
        dirty: bool,
    ) -> Result<(), StoreError> {
        sqlx::query(&format!("TRUNCATE {}", self.table))
            .execute(&mut **tx)
            .await?;

        if version.is_some() || dirty {
            sqlx::query(&format!(
                "INSERT INTO {} (version, dirty) VALUES ($1, $2)",
                self.table
            ))
            .bind(version.unwrap_or(NIL_VERSION))
            .bind(dirty)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl VersionStore for PgVersionStore {
    async fn ensure_version_table(&mut self) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (version BIGINT PRIMARY KEY, dirty BOOLEAN NOT NULL)",
            self.table
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn version(&mut self) -> Result<VersionRecord, StoreError> {
        let row: Option<(i64, bool)> =
            sqlx::query_as(&format!("SELECT version, dirty FROM {} LIMIT 1", self.table))
                .fetch_optional(&self.pool)
                .await?;

        Ok(match row {
            Some((version, dirty)) => VersionRecord {
                version: (version != NIL_VERSION).then_some(version),
                dirty,
            },
            None => VersionRecord::default(),
        })
    }

    async fn set_version(&mut self, version: Option<i64>, dirty: bool) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        self.write_record(&mut tx, version, dirty).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply(&mut self, body: &str, version: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(body)).await?;
        self.write_record(&mut tx, Some(version), false).await?;
        tx.commit().await?;
        Ok(())
    }
}

/// Connects to the database named in a [`MigrationConfig`].
#[derive(Debug, Clone)]
pub struct PgConnector {
    pub acquire_timeout: Duration,
}

impl Default for PgConnector {
    fn default() -> Self {
        Self {
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl StoreConnector for PgConnector {
    type Store = PgVersionStore;

    async fn connect(&self, config: &MigrationConfig) -> Result<PgVersionStore, MigrateError> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.db_name);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(MigrateError::Connection)?;

        tracing::info!(host = %config.host, port = config.port, db = %config.db_name, "Connected for migrations");
        PgVersionStore::new(pool, config.version_table.clone())
    }
}
