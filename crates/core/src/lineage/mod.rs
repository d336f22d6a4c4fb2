//! Lineage between a revision-stage record and the record it supersedes.

use std::collections::{HashMap, HashSet};

use pagu_shared::types::ProposalId;
use tracing::warn;

use crate::proposal::ProposalRecord;

/// How a record's lineage pointer resolves against the previous stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lineage<'a> {
    /// Pointer resolves to this committed predecessor.
    Linked(&'a ProposalRecord),
    /// Pointer resolves, but the predecessor is not committed (blocked or
    /// not accepted).
    Uncommitted(&'a ProposalRecord),
    /// No pointer: the record is new in its stage.
    Unlinked,
    /// Pointer set but the predecessor is missing.
    Dangling(ProposalId),
}

/// Lookup from predecessor id to predecessor record.
#[derive(Debug, Default)]
pub struct LineageIndex<'a> {
    by_id: HashMap<ProposalId, &'a ProposalRecord>,
}

impl<'a> LineageIndex<'a> {
    /// Indexes the previous stage's records, committed or not.
    #[must_use]
    pub fn new(predecessors: &'a [ProposalRecord]) -> Self {
        Self {
            by_id: predecessors.iter().map(|r| (r.id, r)).collect(),
        }
    }

    /// Number of indexed predecessors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True if no predecessors were indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Resolves `record`'s lineage pointer.
    ///
    /// Dangling pointers are logged; callers decide how to treat them.
    #[must_use]
    pub fn resolve(&self, record: &ProposalRecord) -> Lineage<'a> {
        match record.lineage_id {
            None => Lineage::Unlinked,
            Some(id) => match self.by_id.get(&id) {
                Some(predecessor) if predecessor.is_committed() => Lineage::Linked(predecessor),
                Some(predecessor) => Lineage::Uncommitted(predecessor),
                None => {
                    warn!(
                        record_id = %record.id,
                        lineage_id = %id,
                        stage = %record.stage,
                        unit_id = %record.unit_id,
                        "lineage pointer does not resolve in the previous stage"
                    );
                    Lineage::Dangling(id)
                }
            },
        }
    }
}

/// Ids of previous-stage records already carried into the stage holding `records`.
#[must_use]
pub fn migrated_set(records: &[ProposalRecord]) -> HashSet<ProposalId> {
    records.iter().filter_map(|r| r.lineage_id).collect()
}

/// Lineage pointers shared by more than one record of the same stage.
///
/// Empty when the uniqueness invariant holds.
#[must_use]
pub fn check_unique(records: &[ProposalRecord]) -> Vec<ProposalId> {
    let mut seen = HashSet::new();
    let mut duplicates: Vec<ProposalId> = records
        .iter()
        .filter_map(|r| r.lineage_id)
        .filter(|id| !seen.insert(*id))
        .collect();
    duplicates.sort_unstable();
    duplicates.dedup();
    duplicates
}
