//! Pure migration planning.

use chrono::{DateTime, Utc};
use pagu_shared::auth::Role;
use pagu_shared::types::{UnitId, UserId};
use std::collections::BTreeSet;

use crate::lineage::migrated_set;
use crate::migration::error::MigrationError;
use crate::proposal::ProposalRecord;
use crate::stage::Stage;
use crate::workflow::Actor;

/// Which units a migration covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationScope {
    /// One unit.
    Unit(UnitId),
    /// Every unit.
    All,
}

impl MigrationScope {
    /// The unit, for a unit scope.
    #[must_use]
    pub const fn unit(&self) -> Option<&UnitId> {
        match self {
            Self::Unit(unit) => Some(unit),
            Self::All => None,
        }
    }

    /// True if `record` belongs to the scope.
    #[must_use]
    pub fn covers(&self, record: &ProposalRecord) -> bool {
        self.unit().is_none_or(|u| *u == record.unit_id)
    }

    /// Scope an actor may migrate.
    ///
    /// Unit users migrate their own unit only; administrators migrate any
    /// unit, or everything when no unit is requested. Reviewers do not migrate.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::ScopeNotPermitted` otherwise.
    pub fn for_actor(actor: &Actor, requested: Option<UnitId>) -> Result<Self, MigrationError> {
        match (actor.role, requested) {
            (Role::Administrator, Some(unit)) => Ok(Self::Unit(unit)),
            (Role::Administrator, None) => Ok(Self::All),
            (Role::Unit, requested) => match (&actor.unit, requested) {
                (Some(own), None) => Ok(Self::Unit(own.clone())),
                (Some(own), Some(unit)) if *own == unit => Ok(Self::Unit(unit)),
                _ => Err(MigrationError::ScopeNotPermitted(actor.role)),
            },
            (Role::Reviewer, _) => Err(MigrationError::ScopeNotPermitted(actor.role)),
        }
    }
}

/// Records to insert into the destination.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Source stage.
    pub source: Stage,
    /// Destination stage.
    pub destination: Stage,
    /// New destination records, one per eligible source record.
    pub copies: Vec<ProposalRecord>,
    /// Eligible source records skipped because they were migrated before.
    pub skipped_already_migrated: usize,
    /// Units receiving copies.
    pub affected_units: BTreeSet<UnitId>,
}

impl MigrationPlan {
    /// True if nothing needs inserting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }
}

/// Stateless migration planning.
pub struct MigrationPlanner;

impl MigrationPlanner {
    /// Validates a migration between stages and returns `(source, destination)`.
    ///
    /// The source defaults to the stage right before `destination`.
    ///
    /// # Errors
    ///
    /// * `MigrationError::SameStage` if `source == destination`
    /// * `MigrationError::NoPredecessor` for an Initial destination
    /// * `MigrationError::NotAdjacent` if `source` is not `destination - 1`
    pub fn stages(
        destination: Stage,
        source: Option<Stage>,
    ) -> Result<(Stage, Stage), MigrationError> {
        if source == Some(destination) {
            return Err(MigrationError::SameStage(destination));
        }
        let previous = destination
            .previous()
            .ok_or(MigrationError::NoPredecessor(destination))?;
        match source {
            Some(source) if source != previous => Err(MigrationError::NotAdjacent {
                source_stage: source,
                destination,
            }),
            _ => Ok((previous, destination)),
        }
    }

    /// Plans the copies for one migration run.
    ///
    /// Only Accepted, unblocked source records inside `scope` are eligible.
    /// Records already referenced by a destination lineage pointer are skipped,
    /// which makes re-running a migration a no-op. Destination pointers that
    /// match no source record never block a copy.
    #[must_use]
    pub fn plan(
        source: Stage,
        destination: Stage,
        source_records: &[ProposalRecord],
        destination_records: &[ProposalRecord],
        scope: &MigrationScope,
        migrated_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> MigrationPlan {
        let in_scope: Vec<ProposalRecord> = destination_records
            .iter()
            .filter(|r| scope.covers(r))
            .cloned()
            .collect();
        let migrated = migrated_set(&in_scope);

        let mut skipped_already_migrated = 0;
        let mut affected_units = BTreeSet::new();
        let mut copies = Vec::new();
        for record in source_records
            .iter()
            .filter(|r| r.is_committed() && scope.covers(r))
        {
            if migrated.contains(&record.id) {
                skipped_already_migrated += 1;
                continue;
            }
            affected_units.insert(record.unit_id.clone());
            copies.push(record.carry_forward(destination, migrated_by, now));
        }

        MigrationPlan {
            source,
            destination,
            copies,
            skipped_already_migrated,
            affected_units,
        }
    }
}
