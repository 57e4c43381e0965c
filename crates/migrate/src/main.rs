//! Applies the catalog schema migrations.
//!
//! Reads [`MigrationConfig`] from the environment (and `.env`). Setting
//! `MIGRATION_FORCE_VERSION` overwrites the version record with a clean
//! version instead of migrating; a negative value clears it. Use it to recover
//! after a failed step has left the record dirty.

use anyhow::Context;
use catalog_db::migrate::{
    migrate, MigrationConfig, MigrationRunner, MigrationSource, PgConnector, StoreConnector,
    VersionStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_migrate=info,catalog_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = MigrationConfig::from_env().context("Failed to load migration config")?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        db = %config.db_name,
        dir = %config.source_dir().display(),
        "Loaded migration configuration"
    );

    let connector = PgConnector::default();

    // --- Force ---
    if let Ok(raw) = std::env::var("MIGRATION_FORCE_VERSION") {
        let version: i64 = raw
            .trim()
            .parse()
            .with_context(|| format!("MIGRATION_FORCE_VERSION is not a number: {raw}"))?;
        force(&config, &connector, (version >= 0).then_some(version)).await?;
        return Ok(());
    }

    // --- Migrate ---
    let outcome = migrate(&config, &connector)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!(changed = outcome.changed(), "Done");
    Ok(())
}

async fn force(
    config: &MigrationConfig,
    connector: &PgConnector,
    version: Option<i64>,
) -> anyhow::Result<()> {
    config.validate()?;
    let source = MigrationSource::load(&config.source_dir())?;
    let mut store = connector.connect(config).await?;
    store
        .ensure_version_table()
        .await
        .context("Failed to create version table")?;

    let mut runner = MigrationRunner::new(store, source);
    runner.force(version).await?;
    tracing::info!(version = ?version, "Migration version forced");
    Ok(())
}
