//! Planning: which scripts move the schema from the current version to the
//! target, in which order.

use std::fmt;

use crate::migrate::config::MigrationTarget;
use crate::migrate::source::MigrationSource;
use crate::migrate::MigrateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
        })
    }
}

/// One script to run and the version the schema is at once it has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    /// Version of the script being run.
    pub version: i64,
    pub title: String,
    pub direction: Direction,
    pub body: String,
    /// Version recorded after the step: the script's own version going up,
    /// the previous version going down.
    pub resulting_version: i64,
}

/// Compute the steps from `current` to `target`.
///
/// Returns [`MigrateError::NoChange`] when the schema is already there.
pub fn plan(
    source: &MigrationSource,
    current: Option<i64>,
    target: MigrationTarget,
) -> Result<Vec<MigrationStep>, MigrateError> {
    if let Some(version) = current {
        if !source.contains(version) {
            return Err(MigrateError::MissingCurrentVersion(version));
        }
    }

    let target_version = match target {
        MigrationTarget::Latest => source.latest().ok_or(MigrateError::NoChange)?,
        MigrationTarget::Version(version) => {
            if !source.contains(version) {
                return Err(MigrateError::UnknownVersion(version));
            }
            version
        }
    };

    let steps = match current {
        Some(version) if version == target_version => Vec::new(),
        Some(version) if version > target_version => {
            let mut steps = Vec::new();
            for migration in source.range(Some(target_version), version).rev() {
                let body = migration
                    .down
                    .clone()
                    .ok_or(MigrateError::MissingDown(migration.version))?;
                // The target itself is in the source, so every version above
                // it has a predecessor.
                let resulting_version = source.prev(migration.version).unwrap_or(target_version);
                steps.push(MigrationStep {
                    version: migration.version,
                    title: migration.title.clone(),
                    direction: Direction::Down,
                    body,
                    resulting_version,
                });
            }
            steps
        }
        _ => source
            .range(current, target_version)
            .map(|migration| MigrationStep {
                version: migration.version,
                title: migration.title.clone(),
                direction: Direction::Up,
                body: migration.up.clone(),
                resulting_version: migration.version,
            })
            .collect(),
    };

    if steps.is_empty() {
        Err(MigrateError::NoChange)
    } else {
        Ok(steps)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn source() -> MigrationSource {
        MigrationSource::from_scripts([
            ("1_create_products.up.sql", "up 1"),
            ("1_create_products.down.sql", "down 1"),
            ("3_add_name_index.up.sql", "up 3"),
            ("3_add_name_index.down.sql", "down 3"),
            ("7_add_sku.up.sql", "up 7"),
            ("7_add_sku.down.sql", "down 7"),
        ])
        .unwrap()
    }

    fn summary(steps: &[MigrationStep]) -> Vec<(i64, Direction, i64)> {
        steps
            .iter()
            .map(|s| (s.version, s.direction, s.resulting_version))
            .collect()
    }

    #[test]
    fn latest_from_empty_applies_everything_in_order() {
        let steps = plan(&source(), None, MigrationTarget::Latest).unwrap();
        assert_eq!(
            summary(&steps),
            vec![
                (1, Direction::Up, 1),
                (3, Direction::Up, 3),
                (7, Direction::Up, 7)
            ]
        );
        assert_eq!(steps[0].body, "up 1");
    }

    #[test]
    fn latest_from_middle_applies_only_pending() {
        let steps = plan(&source(), Some(3), MigrationTarget::Latest).unwrap();
        assert_eq!(summary(&steps), vec![(7, Direction::Up, 7)]);
    }

    #[test]
    fn latest_when_current_is_latest_is_no_change() {
        assert_matches!(
            plan(&source(), Some(7), MigrationTarget::Latest),
            Err(MigrateError::NoChange)
        );
    }

    #[test]
    fn empty_source_is_no_change() {
        assert_matches!(
            plan(&MigrationSource::default(), None, MigrationTarget::Latest),
            Err(MigrateError::NoChange)
        );
    }

    #[test]
    fn explicit_target_above_current_goes_up_to_it() {
        let steps = plan(&source(), None, MigrationTarget::Version(3)).unwrap();
        assert_eq!(
            summary(&steps),
            vec![(1, Direction::Up, 1), (3, Direction::Up, 3)]
        );
    }

    #[test]
    fn explicit_target_below_current_goes_down_newest_first() {
        let steps = plan(&source(), Some(7), MigrationTarget::Version(1)).unwrap();
        assert_eq!(
            summary(&steps),
            vec![(7, Direction::Down, 3), (3, Direction::Down, 1)]
        );
        assert_eq!(steps[0].body, "down 7");
    }

    #[test]
    fn explicit_target_equal_to_current_is_no_change() {
        assert_matches!(
            plan(&source(), Some(3), MigrationTarget::Version(3)),
            Err(MigrateError::NoChange)
        );
    }

    #[test]
    fn unknown_target_is_rejected() {
        assert_matches!(
            plan(&source(), Some(1), MigrationTarget::Version(5)),
            Err(MigrateError::UnknownVersion(5))
        );
    }

    #[test]
    fn current_version_missing_from_source_is_rejected() {
        assert_matches!(
            plan(&source(), Some(4), MigrationTarget::Latest),
            Err(MigrateError::MissingCurrentVersion(4))
        );
    }

    #[test]
    fn going_down_through_a_version_without_down_script_fails() {
        let src = MigrationSource::from_scripts([
            ("1_a.up.sql", "up 1"),
            ("2_b.up.sql", "up 2"),
        ])
        .unwrap();
        assert_matches!(
            plan(&src, Some(2), MigrationTarget::Version(1)),
            Err(MigrateError::MissingDown(2))
        );
    }
}
