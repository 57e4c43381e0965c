//! Schema migrations.
//!
//! [`migrate`] is the entry point: it validates a [`MigrationConfig`], loads
//! the [`MigrationSource`], connects a [`VersionStore`] and hands both to a
//! [`MigrationRunner`]. Every step first marks the record dirty at the version
//! it is heading to; the store then runs the script and writes the clean
//! version. A dirty record blocks further runs until [`MigrationRunner::force`].

pub mod config;
pub mod plan;
pub mod postgres;
pub mod source;
pub mod version_store;

use std::path::PathBuf;

pub use config::{MigrationConfig, MigrationTarget};
pub use plan::{plan, Direction, MigrationStep};
pub use postgres::{PgConnector, PgVersionStore};
pub use source::{Migration, MigrationSource};
pub use version_store::{StoreConnector, VersionRecord, VersionStore};

use crate::store::StoreError;

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("invalid migration config: {0}")]
    Config(String),

    #[error("failed to connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("failed to read migrations at {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid migration source: {0}")]
    InvalidSource(String),

    #[error("target version {0} is not in the migration source")]
    UnknownVersion(i64),

    #[error("current version {0} is not in the migration source")]
    MissingCurrentVersion(i64),

    #[error("version {0} has no down migration")]
    MissingDown(i64),

    #[error("database is dirty at version {version:?}; fix it and force a version")]
    Dirty { version: Option<i64> },

    #[error("version store {operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("migration {version} ({direction}) failed: {source}")]
    Step {
        version: i64,
        direction: Direction,
        #[source]
        source: StoreError,
    },

    /// Nothing to apply. Absorbed by [`MigrationRunner::migrate_to`].
    #[error("no change")]
    NoChange,
}

impl MigrateError {
    fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| MigrateError::Store { operation, source }
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// `skip_migration` was set; nothing was contacted.
    Skipped,
    /// Already at the target.
    Unchanged { version: Option<i64> },
    Applied {
        from: Option<i64>,
        to: i64,
        steps: usize,
    },
}

impl MigrationOutcome {
    /// Whether the schema was modified.
    pub fn changed(&self) -> bool {
        matches!(self, MigrationOutcome::Applied { .. })
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Applies a [`MigrationSource`] against one [`VersionStore`].
pub struct MigrationRunner<S> {
    store: S,
    source: MigrationSource,
}

impl<S: VersionStore> MigrationRunner<S> {
    pub fn new(store: S, source: MigrationSource) -> Self {
        Self { store, source }
    }

    pub fn source(&self) -> &MigrationSource {
        &self.source
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub async fn version(&mut self) -> Result<VersionRecord, MigrateError> {
        self.store
            .version()
            .await
            .map_err(MigrateError::store("read version"))
    }

    /// Overwrite the record with a clean `version` without running anything.
    pub async fn force(&mut self, version: Option<i64>) -> Result<(), MigrateError> {
        if let Some(v) = version {
            if !self.source.contains(v) {
                return Err(MigrateError::UnknownVersion(v));
            }
        }
        self.store
            .set_version(version, false)
            .await
            .map_err(MigrateError::store("force version"))?;
        tracing::warn!(version = ?version, "Forced migration version");
        Ok(())
    }

    /// Move the schema to `target`.
    pub async fn migrate_to(
        &mut self,
        target: MigrationTarget,
    ) -> Result<MigrationOutcome, MigrateError> {
        let record = self.version().await?;
        if record.dirty {
            tracing::warn!(version = ?record.version, "Refusing to migrate a dirty database");
            return Err(MigrateError::Dirty {
                version: record.version,
            });
        }

        let steps = match plan(&self.source, record.version, target) {
            Ok(steps) => steps,
            Err(MigrateError::NoChange) => {
                tracing::info!(version = ?record.version, "No migrations to apply");
                return Ok(MigrationOutcome::Unchanged {
                    version: record.version,
                });
            }
            Err(e) => return Err(e),
        };

        // `plan` never returns an empty list.
        let count = steps.len();
        let mut to = steps[0].resulting_version;
        for step in &steps {
            self.run_step(step).await?;
            to = step.resulting_version;
        }

        Ok(MigrationOutcome::Applied {
            from: record.version,
            to,
            steps: count,
        })
    }

    async fn run_step(&mut self, step: &MigrationStep) -> Result<(), MigrateError> {
        let failed = |source| MigrateError::Step {
            version: step.version,
            direction: step.direction,
            source,
        };

        self.store
            .set_version(Some(step.resulting_version), true)
            .await
            .map_err(failed)?;
        self.store
            .apply(&step.body, step.resulting_version)
            .await
            .map_err(failed)?;

        tracing::info!(
            version = step.version,
            title = %step.title,
            direction = %step.direction,
            "Applied migration"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the migrations described by `config`.
pub async fn migrate<C: StoreConnector>(
    config: &MigrationConfig,
    connector: &C,
) -> Result<MigrationOutcome, MigrateError> {
    if config.skip_migration {
        tracing::info!("Skipping migrations");
        return Ok(MigrationOutcome::Skipped);
    }

    config.validate()?;
    let source = MigrationSource::load(&config.source_dir())?;

    let mut store = connector.connect(config).await?;
    store
        .ensure_version_table()
        .await
        .map_err(MigrateError::store("create version table"))?;

    let mut runner = MigrationRunner::new(store, source);
    let outcome = runner.migrate_to(config.target()).await?;
    tracing::info!(?outcome, db = %config.db_name, "Migration finished");
    Ok(outcome)
}
