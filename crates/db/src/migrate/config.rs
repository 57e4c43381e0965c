//! Migration run configuration.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::migrate::MigrateError;

/// Version table used when none is configured.
pub const DEFAULT_VERSION_TABLE: &str = "schema_migrations";

/// Migrations directory, relative to the workspace root, used when none is
/// configured.
pub const DEFAULT_MIGRATIONS_DIR: &str = "db/migrations";

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid regex"));

/// Root that relative migration directories are resolved against: the
/// workspace root, fixed at compile time so the process working directory
/// never matters.
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Reject anything that is not a plain, unquoted SQL identifier.
pub fn validate_identifier(name: &str) -> Result<(), MigrateError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(MigrateError::Config(format!(
            "version table name '{name}' must be a plain SQL identifier"
        )))
    }
}

/// What a run should migrate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationTarget {
    /// Apply every pending up migration.
    Latest,
    /// Move up or down to exactly this version.
    Version(i64),
}

/// Settings for one migration run.
///
/// | Env Var                    | Field            | Default             |
/// |----------------------------|------------------|---------------------|
/// | `MIGRATION_SKIP`           | `skip_migration` | `false`             |
/// | `DB_HOST`                  | `host`           | `localhost`         |
/// | `DB_PORT`                  | `port`           | `5432`              |
/// | `DB_USER`                  | `user`           | `postgres`          |
/// | `DB_PASSWORD`              | `password`       | empty               |
/// | `DB_NAME`                  | `db_name`        | empty (required)    |
/// | `MIGRATION_VERSION_TABLE`  | `version_table`  | `schema_migrations` |
/// | `MIGRATION_DIR`            | `migrations_dir` | `db/migrations`     |
/// | `MIGRATION_TARGET_VERSION` | `target_version` | `0` (latest)        |
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    pub skip_migration: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub db_name: String,
    pub version_table: String,
    /// Relative paths are resolved against [`workspace_root`].
    pub migrations_dir: PathBuf,
    /// `0` migrates to the latest version.
    pub target_version: i64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            skip_migration: false,
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: String::new(),
            db_name: String::new(),
            version_table: DEFAULT_VERSION_TABLE.into(),
            migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
            target_version: 0,
        }
    }
}

impl MigrationConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Result<Self, MigrateError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, MigrateError> {
        let defaults = Self::default();

        let skip_migration = match lookup("MIGRATION_SKIP") {
            Some(raw) => parse_bool("MIGRATION_SKIP", &raw)?,
            None => defaults.skip_migration,
        };

        Ok(Self {
            skip_migration,
            host: lookup("DB_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "DB_PORT", defaults.port)?,
            user: lookup("DB_USER").unwrap_or(defaults.user),
            password: lookup("DB_PASSWORD").unwrap_or(defaults.password),
            db_name: lookup("DB_NAME").unwrap_or(defaults.db_name),
            version_table: lookup("MIGRATION_VERSION_TABLE").unwrap_or(defaults.version_table),
            migrations_dir: lookup("MIGRATION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.migrations_dir),
            target_version: parse_or(&lookup, "MIGRATION_TARGET_VERSION", defaults.target_version)?,
        })
    }

    /// Check the fields a run needs before any connection is attempted.
    pub fn validate(&self) -> Result<(), MigrateError> {
        if self.db_name.trim().is_empty() {
            return Err(MigrateError::Config("db_name is required".into()));
        }
        validate_identifier(&self.version_table)?;
        if self.target_version < 0 {
            return Err(MigrateError::Config(format!(
                "target_version must be >= 0, got {}",
                self.target_version
            )));
        }
        Ok(())
    }

    pub fn target(&self) -> MigrationTarget {
        match self.target_version {
            0 => MigrationTarget::Latest,
            v => MigrationTarget::Version(v),
        }
    }

    /// Directory holding the migration scripts.
    pub fn source_dir(&self) -> PathBuf {
        if self.migrations_dir.is_absolute() {
            self.migrations_dir.clone()
        } else {
            workspace_root().join(&self.migrations_dir)
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, MigrateError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| MigrateError::Config(format!("{key} is not valid: {e}"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, MigrateError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(MigrateError::Config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
