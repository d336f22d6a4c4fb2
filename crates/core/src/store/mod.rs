//! Storage abstraction.
//!
//! The engine only needs to read matching records, write or update a record,
//! upsert a summary row and append history. Two optional capabilities let a
//! backend do migration copies and per-unit aggregation server-side.

pub mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagu_shared::types::{PageRequest, ProposalId, UnitId, UserId};
use rust_decimal::Decimal;

use crate::context::{CycleSettings, Unit};
use crate::proposal::ProposalRecord;
use crate::stage::{Stage, StageLocation};
use crate::summary::{StageAggregate, UnitSummary};
use crate::workflow::{HistoryEntry, ReviewStatus};

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;

/// Optional server-side capabilities of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCapabilities {
    /// [`ProposalStore::bulk_copy`] is implemented.
    pub bulk_copy: bool,
    /// [`ProposalStore::aggregate_unit`] is implemented.
    pub aggregate: bool,
}

/// Filter for [`ProposalStore::list_records`]; `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Owning unit.
    pub unit_id: Option<UnitId>,
    /// Review status.
    pub status: Option<ReviewStatus>,
    /// Blocked flag.
    pub blocked: Option<bool>,
    /// Lineage pointer.
    pub lineage_id: Option<ProposalId>,
    /// Category, exact match.
    pub category: Option<String>,
    /// Subcategory, exact match.
    pub subcategory: Option<String>,
}

impl RecordFilter {
    /// Records of one unit, or of every unit when `unit` is `None`.
    #[must_use]
    pub fn scoped(unit: Option<&UnitId>) -> Self {
        Self {
            unit_id: unit.cloned(),
            ..Self::default()
        }
    }

    /// Restricts to Accepted, unblocked records.
    #[must_use]
    pub fn committed(mut self) -> Self {
        self.status = Some(ReviewStatus::Accepted);
        self.blocked = Some(false);
        self
    }

    /// True if `record` passes the filter.
    #[must_use]
    pub fn matches(&self, record: &ProposalRecord) -> bool {
        self.unit_id.as_ref().is_none_or(|u| *u == record.unit_id)
            && self.status.is_none_or(|s| s == record.status)
            && self.blocked.is_none_or(|b| b == record.blocked)
            && self
                .lineage_id
                .is_none_or(|id| record.lineage_id == Some(id))
            && self
                .category
                .as_ref()
                .is_none_or(|c| *c == record.classification.category)
            && self
                .subcategory
                .as_ref()
                .is_none_or(|s| record.classification.subcategory.as_ref() == Some(s))
    }
}

/// Filter for [`ProposalStore::list_history`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Entries of one record.
    pub record_id: Option<ProposalId>,
    /// Entries of one unit.
    pub unit_id: Option<UnitId>,
    /// Entries of one stage.
    pub stage: Option<Stage>,
}

impl HistoryQuery {
    /// True if `entry` passes the query.
    #[must_use]
    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        self.record_id.is_none_or(|id| id == entry.record_id)
            && self.unit_id.as_ref().is_none_or(|u| *u == entry.unit_id)
            && self.stage.is_none_or(|s| s == entry.stage)
    }
}

/// Server-side migration copy request.
#[derive(Debug, Clone)]
pub struct BulkCopyRequest {
    /// Source stage.
    pub source: Stage,
    /// Source table.
    pub source_location: StageLocation,
    /// Destination stage.
    pub destination: Stage,
    /// Destination table.
    pub destination_location: StageLocation,
    /// Restrict to one unit.
    pub unit_id: Option<UnitId>,
    /// Recorded as creator of the copies.
    pub migrated_by: Option<UserId>,
    /// Timestamp of the copies.
    pub at: DateTime<Utc>,
}

/// Tabular store holding one table per stage plus units, summaries,
/// history and cycle settings.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Optional capabilities; none by default.
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::default()
    }

    /// Records of one stage matching `filter`.
    async fn list_records(
        &self,
        location: &StageLocation,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<ProposalRecord>>;

    /// One record by id.
    async fn get_record(
        &self,
        location: &StageLocation,
        id: ProposalId,
    ) -> StoreResult<Option<ProposalRecord>>;

    /// Inserts one record.
    async fn insert_record(
        &self,
        location: &StageLocation,
        record: &ProposalRecord,
    ) -> StoreResult<()> {
        self.insert_records(location, std::slice::from_ref(record))
            .await
    }

    /// Inserts a batch; either every record is written or none is.
    ///
    /// Fails with `StoreError::Conflict` if a lineage pointer is already taken.
    async fn insert_records(
        &self,
        location: &StageLocation,
        records: &[ProposalRecord],
    ) -> StoreResult<()>;

    /// Replaces a record; `StoreError::NotFound` if it does not exist.
    async fn update_record(
        &self,
        location: &StageLocation,
        record: &ProposalRecord,
    ) -> StoreResult<()>;

    /// Deletes a record and its history; false if it did not exist.
    async fn delete_record(&self, location: &StageLocation, id: ProposalId) -> StoreResult<bool>;

    /// One unit.
    async fn get_unit(&self, id: &UnitId) -> StoreResult<Option<Unit>>;

    /// All units, ordered by id.
    async fn list_units(&self) -> StoreResult<Vec<Unit>>;

    /// Creates or replaces a unit.
    async fn upsert_unit(&self, unit: &Unit) -> StoreResult<()>;

    /// Sets a unit's ceiling; `None` if the unit does not exist.
    async fn set_ceiling(&self, id: &UnitId, ceiling: Decimal) -> StoreResult<Option<Unit>>;

    /// Creates or fully replaces a unit's summary row.
    async fn upsert_summary(&self, summary: &UnitSummary) -> StoreResult<()>;

    /// A unit's summary row.
    async fn get_summary(&self, unit: &UnitId) -> StoreResult<Option<UnitSummary>>;

    /// Every summary row, ordered by unit.
    async fn list_summaries(&self) -> StoreResult<Vec<UnitSummary>>;

    /// Appends history entries.
    async fn append_history(&self, entries: &[HistoryEntry]) -> StoreResult<()>;

    /// One page of matching history, newest first, plus the total count.
    async fn list_history(
        &self,
        query: &HistoryQuery,
        page: &PageRequest,
    ) -> StoreResult<(Vec<HistoryEntry>, u64)>;

    /// Current cycle settings; defaults if never saved.
    async fn load_settings(&self) -> StoreResult<CycleSettings>;

    /// Replaces the cycle settings.
    async fn save_settings(&self, settings: &CycleSettings) -> StoreResult<()>;

    /// Copies committed, not yet migrated records from `source` into
    /// `destination` in one operation and returns the inserted copies.
    async fn bulk_copy(&self, _request: &BulkCopyRequest) -> StoreResult<Vec<ProposalRecord>> {
        Err(StoreError::Unsupported("bulk_copy"))
    }

    /// Aggregates one unit's records of one stage.
    async fn aggregate_unit(
        &self,
        _location: &StageLocation,
        _unit: &UnitId,
    ) -> StoreResult<StageAggregate> {
        Err(StoreError::Unsupported("aggregate_unit"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::types::fixtures::{record, with_status};
    use rust_decimal_macros::dec;

    #[test]
    fn test_committed_filter() {
        let filter = RecordFilter::scoped(Some(&UnitId::parse("U1").unwrap())).committed();
        let mut accepted = with_status("U1", Stage::Initial, dec!(1), ReviewStatus::Accepted);
        assert!(filter.matches(&accepted));
        accepted.blocked = true;
        assert!(!filter.matches(&accepted));
        assert!(!filter.matches(&with_status(
            "U2",
            Stage::Initial,
            dec!(1),
            ReviewStatus::Accepted
        )));
        assert!(!filter.matches(&record("U1", Stage::Initial, dec!(1), dec!(1))));
    }

    #[test]
    fn test_classification_filter() {
        let r = record("U1", Stage::Initial, dec!(1), dec!(1));
        let filter = RecordFilter {
            category: Some("Goods".into()),
            subcategory: Some("Office".into()),
            ..RecordFilter::default()
        };
        assert!(filter.matches(&r));
        let filter = RecordFilter {
            subcategory: Some("Travel".into()),
            ..RecordFilter::default()
        };
        assert!(!filter.matches(&r));
    }
}
