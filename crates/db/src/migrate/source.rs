//! Versioned migration scripts.
//!
//! Scripts are files named `{version}_{title}.up.sql` and
//! `{version}_{title}.down.sql`. Every version needs an up script; the down
//! script is optional. Files that do not follow the pattern are ignored.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::migrate::MigrateError;

static SCRIPT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)_([A-Za-z0-9_\-]+)\.(up|down)\.sql$").expect("valid regex")
});

/// One version of the schema: its up script and, optionally, its down script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub title: String,
    pub up: String,
    pub down: Option<String>,
}

/// An ordered set of migrations, keyed by version.
#[derive(Debug, Clone, Default)]
pub struct MigrationSource {
    migrations: BTreeMap<i64, Migration>,
}

#[derive(Default)]
struct PartialMigration {
    title: String,
    up: Option<String>,
    down: Option<String>,
}

impl MigrationSource {
    /// Read every script in `dir`.
    pub fn load(dir: &Path) -> Result<Self, MigrateError> {
        let io_err = |source| MigrateError::Source {
            path: dir.to_path_buf(),
            source,
        };

        let mut scripts = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !SCRIPT_NAME_RE.is_match(file_name) {
                tracing::debug!(file = %path.display(), "Ignoring non-migration file");
                continue;
            }
            let body = std::fs::read_to_string(&path).map_err(|source| MigrateError::Source {
                path: path.clone(),
                source,
            })?;
            scripts.push((file_name.to_string(), body));
        }

        Self::from_scripts(scripts)
    }

    /// Build a source from `(file name, body)` pairs.
    pub fn from_scripts<I, N, B>(scripts: I) -> Result<Self, MigrateError>
    where
        I: IntoIterator<Item = (N, B)>,
        N: AsRef<str>,
        B: Into<String>,
    {
        let mut partial: BTreeMap<i64, PartialMigration> = BTreeMap::new();

        for (name, body) in scripts {
            let name = name.as_ref();
            let caps = SCRIPT_NAME_RE.captures(name).ok_or_else(|| {
                MigrateError::InvalidSource(format!(
                    "'{name}' does not match {{version}}_{{title}}.(up|down).sql"
                ))
            })?;

            let version: i64 = caps[1].parse().map_err(|_| {
                MigrateError::InvalidSource(format!("version in '{name}' is out of range"))
            })?;
            let title = caps[2].to_string();
            let slot = partial.entry(version).or_default();

            if !slot.title.is_empty() && slot.title != title {
                return Err(MigrateError::InvalidSource(format!(
                    "version {version} has two titles: '{}' and '{title}'",
                    slot.title
                )));
            }
            slot.title = title;

            let script = match &caps[3] {
                "up" => &mut slot.up,
                _ => &mut slot.down,
            };
            if script.is_some() {
                return Err(MigrateError::InvalidSource(format!(
                    "duplicate {} script for version {version}",
                    &caps[3]
                )));
            }
            *script = Some(body.into());
        }

        let mut migrations = BTreeMap::new();
        for (version, p) in partial {
            let up = p.up.ok_or_else(|| {
                MigrateError::InvalidSource(format!("version {version} has no up script"))
            })?;
            migrations.insert(
                version,
                Migration {
                    version,
                    title: p.title,
                    up,
                    down: p.down,
                },
            );
        }

        Ok(Self { migrations })
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn get(&self, version: i64) -> Option<&Migration> {
        self.migrations.get(&version)
    }

    pub fn contains(&self, version: i64) -> bool {
        self.migrations.contains_key(&version)
    }

    /// All versions, ascending.
    pub fn versions(&self) -> impl Iterator<Item = i64> + '_ {
        self.migrations.keys().copied()
    }

    pub fn latest(&self) -> Option<i64> {
        self.migrations.keys().next_back().copied()
    }

    /// The closest version below `version`.
    pub fn prev(&self, version: i64) -> Option<i64> {
        self.migrations
            .range(..version)
            .next_back()
            .map(|(v, _)| *v)
    }

    /// Migrations with `after < version <= through`, ascending. `after: None`
    /// starts from the first migration.
    pub fn range(
        &self,
        after: Option<i64>,
        through: i64,
    ) -> impl DoubleEndedIterator<Item = &Migration> + '_ {
        let lower = match after {
            Some(v) => Bound::Excluded(v),
            None => Bound::Unbounded,
        };
        let empty = after.is_some_and(|v| v >= through);
        let range = if empty {
            // BTreeMap::range panics on inverted bounds.
            self.migrations.range((Bound::Excluded(through), Bound::Included(through)))
        } else {
            self.migrations.range((lower, Bound::Included(through)))
        };
        range.map(|(_, m)| m)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
