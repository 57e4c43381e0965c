//! Migration runner behaviour against an in-memory version store.
//!
//! Covers:
//! - Skip short-circuit and config validation before any connection
//! - Applying, re-running and migrating down
//! - Connection failures
//! - Dirty state after a failing step and recovery through `force`

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use catalog_db::migrate::{
    migrate, Direction, MigrateError, MigrationConfig, MigrationOutcome, MigrationRunner,
    MigrationSource, MigrationTarget, StoreConnector, VersionRecord, VersionStore,
};
use catalog_db::store::StoreError;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FakeState {
    table_created: bool,
    record: VersionRecord,
    applied: Vec<String>,
    calls: usize,
}

/// Version store whose state outlives the runner that owns it.
#[derive(Debug, Clone, Default)]
struct FakeStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakeStore {
    fn record(&self) -> VersionRecord {
        self.state.lock().unwrap().record
    }

    fn applied(&self) -> Vec<String> {
        self.state.lock().unwrap().applied.clone()
    }

    fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }
}

#[async_trait]
impl VersionStore for FakeStore {
    async fn ensure_version_table(&mut self) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.table_created = true;
        Ok(())
    }

    async fn version(&mut self) -> Result<VersionRecord, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        Ok(state.record)
    }

    async fn set_version(&mut self, version: Option<i64>, dirty: bool) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.record = VersionRecord { version, dirty };
        Ok(())
    }

    async fn apply(&mut self, body: &str, version: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if body.contains("FAIL") {
            return Err(StoreError::Backend(format!("syntax error in {body}")));
        }
        state.applied.push(body.to_string());
        state.record = VersionRecord {
            version: Some(version),
            dirty: false,
        };
        Ok(())
    }
}

#[derive(Default)]
struct FakeConnector {
    store: FakeStore,
    connects: AtomicUsize,
}

#[async_trait]
impl StoreConnector for FakeConnector {
    type Store = FakeStore;

    async fn connect(&self, _config: &MigrationConfig) -> Result<FakeStore, MigrateError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.clone())
    }
}

/// Connector whose database never answers.
#[derive(Default)]
struct UnreachableConnector {
    store: FakeStore,
    connects: AtomicUsize,
}

#[async_trait]
impl StoreConnector for UnreachableConnector {
    type Store = FakeStore;

    async fn connect(&self, _config: &MigrationConfig) -> Result<FakeStore, MigrateError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Err(MigrateError::Connection(sqlx::Error::PoolTimedOut))
    }
}

fn write_scripts(dir: &Path, scripts: &[(&str, &str)]) {
    for (name, body) in scripts {
        std::fs::write(dir.join(name), body).unwrap();
    }
}

fn products_migrations() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_scripts(
        dir.path(),
        &[
            ("1_create_products.up.sql", "up 1"),
            ("1_create_products.down.sql", "down 1"),
            ("2_add_name_index.up.sql", "up 2"),
            ("2_add_name_index.down.sql", "down 2"),
            ("3_add_sku.up.sql", "up 3"),
            ("3_add_sku.down.sql", "down 3"),
        ],
    );
    dir
}

fn config_for(dir: &TempDir) -> MigrationConfig {
    MigrationConfig {
        db_name: "catalogs".into(),
        migrations_dir: dir.path().to_path_buf(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Test: skip and validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn skip_contacts_nothing() {
    let connector = FakeConnector::default();
    let config = MigrationConfig {
        skip_migration: true,
        ..Default::default()
    };

    let outcome = migrate(&config, &connector).await.unwrap();

    assert_eq!(outcome, MigrationOutcome::Skipped);
    assert!(!outcome.changed());
    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
    assert_eq!(connector.store.calls(), 0);
}

#[tokio::test]
async fn missing_db_name_fails_before_connecting() {
    let dir = products_migrations();
    let connector = FakeConnector::default();
    let config = MigrationConfig {
        db_name: String::new(),
        ..config_for(&dir)
    };

    assert_matches!(
        migrate(&config, &connector).await,
        Err(MigrateError::Config(_))
    );
    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_source_dir_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let connector = FakeConnector::default();
    let config = MigrationConfig {
        db_name: "catalogs".into(),
        migrations_dir: dir.path().join("missing"),
        ..Default::default()
    };

    assert_matches!(
        migrate(&config, &connector).await,
        Err(MigrateError::Source { .. })
    );
    assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn connection_failure_is_fatal_and_touches_no_store() {
    let dir = products_migrations();
    let connector = UnreachableConnector::default();

    let err = migrate(&config_for(&dir), &connector).await.unwrap_err();

    assert_matches!(err, MigrateError::Connection(sqlx::Error::PoolTimedOut));
    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
    assert_eq!(connector.store.calls(), 0);
    assert_eq!(connector.store.record(), VersionRecord::default());
}

// ---------------------------------------------------------------------------
// Test: applying and idempotence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn applies_all_pending_migrations_in_order() {
    let dir = products_migrations();
    let connector = FakeConnector::default();

    let outcome = migrate(&config_for(&dir), &connector).await.unwrap();

    assert_eq!(
        outcome,
        MigrationOutcome::Applied {
            from: None,
            to: 3,
            steps: 3
        }
    );
    assert!(outcome.changed());
    assert!(connector.store.state.lock().unwrap().table_created);
    assert_eq!(connector.store.applied(), vec!["up 1", "up 2", "up 3"]);
    assert_eq!(
        connector.store.record(),
        VersionRecord {
            version: Some(3),
            dirty: false
        }
    );
}

#[tokio::test]
async fn rerun_at_latest_is_unchanged() {
    let dir = products_migrations();
    let connector = FakeConnector::default();
    let config = config_for(&dir);

    migrate(&config, &connector).await.unwrap();
    let before = connector.store.record();

    let outcome = migrate(&config, &connector).await.unwrap();

    assert_eq!(outcome, MigrationOutcome::Unchanged { version: Some(3) });
    assert!(!outcome.changed());
    assert_eq!(connector.store.record(), before);
    assert_eq!(connector.store.applied().len(), 3);
}

#[tokio::test]
async fn empty_source_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let connector = FakeConnector::default();

    let outcome = migrate(&config_for(&dir), &connector).await.unwrap();

    assert_eq!(outcome, MigrationOutcome::Unchanged { version: None });
}

#[tokio::test]
async fn explicit_target_stops_there_then_migrates_down() {
    let dir = products_migrations();
    let connector = FakeConnector::default();

    let up_to_two = MigrationConfig {
        target_version: 2,
        ..config_for(&dir)
    };
    assert_eq!(
        migrate(&up_to_two, &connector).await.unwrap(),
        MigrationOutcome::Applied {
            from: None,
            to: 2,
            steps: 2
        }
    );

    migrate(&config_for(&dir), &connector).await.unwrap();

    let down_to_one = MigrationConfig {
        target_version: 1,
        ..config_for(&dir)
    };
    assert_eq!(
        migrate(&down_to_one, &connector).await.unwrap(),
        MigrationOutcome::Applied {
            from: Some(3),
            to: 1,
            steps: 2
        }
    );
    assert_eq!(
        connector.store.applied(),
        vec!["up 1", "up 2", "up 3", "down 3", "down 2"]
    );
    assert_eq!(connector.store.record().version, Some(1));
}

#[tokio::test]
async fn unknown_target_is_rejected() {
    let dir = products_migrations();
    let connector = FakeConnector::default();
    let config = MigrationConfig {
        target_version: 9,
        ..config_for(&dir)
    };

    assert_matches!(
        migrate(&config, &connector).await,
        Err(MigrateError::UnknownVersion(9))
    );
    assert!(connector.store.applied().is_empty());
}

// ---------------------------------------------------------------------------
// Test: failures and dirty state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failing_step_leaves_record_dirty_until_forced() {
    let dir = tempfile::tempdir().unwrap();
    write_scripts(
        dir.path(),
        &[
            ("1_create_products.up.sql", "up 1"),
            ("2_broken.up.sql", "FAIL 2"),
            ("3_add_sku.up.sql", "up 3"),
        ],
    );
    let connector = FakeConnector::default();
    let config = config_for(&dir);

    let err = migrate(&config, &connector).await.unwrap_err();
    assert_matches!(
        &err,
        MigrateError::Step {
            version: 2,
            direction: Direction::Up,
            source: StoreError::Backend(_)
        }
    );
    assert!(err.to_string().contains("migration 2 (up)"));
    assert_eq!(connector.store.applied(), vec!["up 1"]);
    assert_eq!(
        connector.store.record(),
        VersionRecord {
            version: Some(2),
            dirty: true
        }
    );

    assert_matches!(
        migrate(&config, &connector).await,
        Err(MigrateError::Dirty { version: Some(2) })
    );

    // Operator repairs the script and resets the record to the last good version.
    write_scripts(dir.path(), &[("2_broken.up.sql", "up 2")]);
    let source = MigrationSource::load(dir.path()).unwrap();
    let mut runner = MigrationRunner::new(connector.store.clone(), source);
    runner.force(Some(1)).await.unwrap();
    assert_eq!(
        runner.version().await.unwrap(),
        VersionRecord {
            version: Some(1),
            dirty: false
        }
    );

    assert_eq!(
        migrate(&config, &connector).await.unwrap(),
        MigrationOutcome::Applied {
            from: Some(1),
            to: 3,
            steps: 2
        }
    );
}

#[tokio::test]
async fn force_rejects_versions_outside_the_source() {
    let dir = products_migrations();
    let source = MigrationSource::load(dir.path()).unwrap();
    let store = FakeStore::default();
    let mut runner = MigrationRunner::new(store.clone(), source);

    assert_matches!(
        runner.force(Some(42)).await,
        Err(MigrateError::UnknownVersion(42))
    );
    runner.force(None).await.unwrap();
    assert_eq!(store.record(), VersionRecord::default());
}

#[tokio::test]
async fn runner_honours_explicit_latest_target() {
    let dir = products_migrations();
    let source = MigrationSource::load(dir.path()).unwrap();
    let store = FakeStore::default();
    let mut runner = MigrationRunner::new(store.clone(), source);

    let outcome = runner.migrate_to(MigrationTarget::Latest).await.unwrap();
    assert_eq!(
        outcome,
        MigrationOutcome::Applied {
            from: None,
            to: 3,
            steps: 3
        }
    );
    assert_eq!(runner.source().latest(), Some(3));
}
