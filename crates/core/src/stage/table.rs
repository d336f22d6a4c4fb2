//! Explicit stage → storage location lookup table.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::stage::error::StageError;
use crate::stage::types::{MAX_REVISION, Stage};

/// Table holding Initial-stage proposals.
pub const INITIAL_TABLE: &str = "proposals";

/// Physical storage location (table name) of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StageLocation(String);

impl StageLocation {
    /// Location of `stage` under the standard naming convention.
    #[must_use]
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Initial => Self(INITIAL_TABLE.to_string()),
            Stage::Revision(n) => Self(format!("{INITIAL_TABLE}_rev{n}")),
        }
    }

    /// The table name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookup table from stage to location, built once for `0..=max_revision`.
#[derive(Debug, Clone)]
pub struct StageTable {
    locations: Vec<StageLocation>,
}

impl StageTable {
    /// Builds the table for Initial plus `Revision 1..=max_revision`.
    ///
    /// `max_revision` is clamped to `1..=MAX_REVISION`.
    #[must_use]
    pub fn new(max_revision: u8) -> Self {
        let max_revision = max_revision.clamp(1, MAX_REVISION);
        let locations = std::iter::once(Stage::Initial)
            .chain((1..=max_revision).map(Stage::Revision))
            .map(StageLocation::for_stage)
            .collect();
        Self { locations }
    }

    /// Highest revision with a location.
    #[must_use]
    pub fn max_revision(&self) -> u8 {
        u8::try_from(self.locations.len().saturating_sub(1)).unwrap_or(MAX_REVISION)
    }

    /// All stages with a location, in cycle order.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        std::iter::once(Stage::Initial).chain((1..=self.max_revision()).map(Stage::Revision))
    }

    /// Location of a typed stage.
    ///
    /// # Errors
    ///
    /// Returns `StageError::RevisionOutOfRange` if the revision was not provisioned.
    pub fn location(&self, stage: Stage) -> Result<&StageLocation, StageError> {
        self.locations
            .get(usize::from(stage.index()))
            .ok_or(StageError::RevisionOutOfRange {
                number: u32::from(stage.index()),
                max: self.max_revision(),
            })
    }

    /// Parses a label and checks it against the provisioned range.
    ///
    /// # Errors
    ///
    /// Returns a `StageError` for unknown labels or unprovisioned revisions.
    pub fn resolve(&self, label: &str) -> Result<Stage, StageError> {
        let stage = Stage::parse(label)?;
        self.location(stage)?;
        Ok(stage)
    }

    /// Legacy resolution: anything unresolvable degrades to Revision 1.
    ///
    /// Never fails, but every fallback is logged since it usually hides a
    /// misconfigured client.
    #[must_use]
    pub fn resolve_lenient(&self, label: &str) -> Stage {
        match self.resolve(label) {
            Ok(stage) => stage,
            Err(err) => {
                warn!(label, error = %err, "unresolvable stage label, falling back to Revision 1");
                Stage::Revision(1)
            }
        }
    }

    /// Resolves using the configured strictness.
    ///
    /// # Errors
    ///
    /// Only in strict mode; see [`StageTable::resolve`].
    pub fn resolve_with(&self, label: &str, strict: bool) -> Result<Stage, StageError> {
        if strict {
            self.resolve(label)
        } else {
            Ok(self.resolve_lenient(label))
        }
    }
}

impl Default for StageTable {
    fn default() -> Self {
        Self::new(MAX_REVISION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Stage::Initial, "proposals")]
    #[case(Stage::Revision(1), "proposals_rev1")]
    #[case(Stage::Revision(30), "proposals_rev30")]
    fn test_locations(#[case] stage: Stage, #[case] table: &str) {
        let stages = StageTable::default();
        assert_eq!(stages.location(stage).unwrap().as_str(), table);
    }

    #[test]
    fn test_locations_are_distinct() {
        let stages = StageTable::default();
        let mut names: Vec<_> = stages
            .stages()
            .map(|s| stages.location(s).unwrap().as_str().to_string())
            .collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
        assert_eq!(before, 31);
    }

    #[test]
    fn test_smaller_table_rejects_unprovisioned_revision() {
        let stages = StageTable::new(3);
        assert_eq!(stages.max_revision(), 3);
        assert!(stages.location(Stage::Revision(3)).is_ok());
        assert!(matches!(
            stages.resolve("Revision 4"),
            Err(StageError::RevisionOutOfRange { number: 4, max: 3 })
        ));
    }

    #[test]
    fn test_max_revision_is_capped() {
        assert_eq!(StageTable::new(200).max_revision(), MAX_REVISION);
    }

    #[test]
    fn test_lenient_falls_back_to_first_revision() {
        let stages = StageTable::default();
        assert_eq!(stages.resolve_lenient("Revision 2"), Stage::Revision(2));
        assert_eq!(stages.resolve_lenient("Perubahan"), Stage::Revision(1));
        assert_eq!(stages.resolve_lenient("Revision 99"), Stage::Revision(1));
    }

    #[test]
    fn test_resolve_with_strictness() {
        let stages = StageTable::default();
        assert!(stages.resolve_with("garbage", true).is_err());
        assert_eq!(stages.resolve_with("garbage", false).unwrap(), Stage::Revision(1));
    }
}
