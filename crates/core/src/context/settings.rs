//! Cycle-wide settings shared by every unit.

use chrono::{DateTime, Utc};
use pagu_shared::types::UnitId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Which stage is active and which submission windows are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSettings {
    /// Active revision number; 0 while the cycle is still in the Initial stage.
    pub active_revision: u8,
    /// Units may submit into the active revision.
    pub revision_open: bool,
    /// Units may submit into the Initial stage.
    #[serde(default = "default_initial_open")]
    pub initial_open: bool,
    /// Last change.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_initial_open() -> bool {
    true
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            active_revision: 0,
            revision_open: false,
            initial_open: true,
            updated_at: None,
        }
    }
}

impl CycleSettings {
    /// The active revision stage, if one has been activated.
    #[must_use]
    pub const fn active_stage(&self) -> Option<Stage> {
        match self.active_revision {
            0 => None,
            n => Some(Stage::Revision(n)),
        }
    }

    /// Stage units currently submit into: the active revision while its
    /// window is open, otherwise Initial.
    #[must_use]
    pub const fn working_stage(&self) -> Stage {
        match self.active_stage() {
            Some(stage) if self.revision_open => stage,
            _ => Stage::Initial,
        }
    }

    /// Stages that feed the unit summary: Initial plus the active revision.
    #[must_use]
    pub fn relevant_stages(&self) -> Vec<Stage> {
        std::iter::once(Stage::Initial)
            .chain(self.active_stage())
            .collect()
    }

    /// True if `stage` has been activated (Initial always is).
    #[must_use]
    pub const fn is_activated(&self, stage: Stage) -> bool {
        stage.index() <= self.active_revision
    }

    /// True if units may submit new records into `stage`.
    #[must_use]
    pub const fn accepts_submissions(&self, stage: Stage) -> bool {
        match stage {
            Stage::Initial => self.initial_open,
            Stage::Revision(n) => self.revision_open && n == self.active_revision,
        }
    }
}

/// An organizational budget holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unit code.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Maximum Initial-stage commitment.
    pub ceiling: Decimal,
    /// Inactive units keep their data but are skipped by full rebuilds.
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_initial_stage() {
        let settings = CycleSettings::default();
        assert_eq!(settings.active_stage(), None);
        assert_eq!(settings.working_stage(), Stage::Initial);
        assert_eq!(settings.relevant_stages(), vec![Stage::Initial]);
        assert!(settings.accepts_submissions(Stage::Initial));
        assert!(!settings.accepts_submissions(Stage::Revision(1)));
    }

    #[test]
    fn test_open_revision_window() {
        let settings = CycleSettings {
            active_revision: 2,
            revision_open: true,
            initial_open: false,
            updated_at: None,
        };
        assert_eq!(settings.working_stage(), Stage::Revision(2));
        assert_eq!(
            settings.relevant_stages(),
            vec![Stage::Initial, Stage::Revision(2)]
        );
        assert!(settings.accepts_submissions(Stage::Revision(2)));
        assert!(!settings.accepts_submissions(Stage::Revision(1)));
        assert!(!settings.accepts_submissions(Stage::Initial));
        assert!(settings.is_activated(Stage::Revision(1)));
        assert!(!settings.is_activated(Stage::Revision(3)));
    }

    #[test]
    fn test_closed_revision_still_feeds_summary() {
        let settings = CycleSettings {
            active_revision: 1,
            revision_open: false,
            ..CycleSettings::default()
        };
        assert_eq!(settings.working_stage(), Stage::Initial);
        assert_eq!(settings.relevant_stages().len(), 2);
    }
}
