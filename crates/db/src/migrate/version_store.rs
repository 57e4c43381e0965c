//! Where the applied schema version is recorded.

use async_trait::async_trait;

use crate::migrate::config::MigrationConfig;
use crate::migrate::MigrateError;
use crate::store::StoreError;

/// The recorded schema version.
///
/// `version: None` means nothing has been applied. `dirty` is set while a
/// step runs and stays set if the step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionRecord {
    pub version: Option<i64>,
    pub dirty: bool,
}

/// Storage for the version record plus the ability to run a script.
#[async_trait]
pub trait VersionStore: Send {
    /// Create the version table if it does not exist.
    async fn ensure_version_table(&mut self) -> Result<(), StoreError>;

    async fn version(&mut self) -> Result<VersionRecord, StoreError>;

    /// Replace the record.
    async fn set_version(&mut self, version: Option<i64>, dirty: bool) -> Result<(), StoreError>;

    /// Run `body` and record `version` as clean, atomically.
    async fn apply(&mut self, body: &str, version: i64) -> Result<(), StoreError>;
}

/// Opens a [`VersionStore`] for a configuration.
#[async_trait]
pub trait StoreConnector: Sync {
    type Store: VersionStore;

    async fn connect(&self, config: &MigrationConfig) -> Result<Self::Store, MigrateError>;
}
