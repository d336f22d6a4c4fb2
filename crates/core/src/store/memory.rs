//! In-memory store.
//!
//! Behaves like the Postgres store, including the lineage uniqueness
//! constraint and all-or-nothing batch inserts. Used by tests and by the
//! server when no database is configured.

use async_trait::async_trait;
use pagu_shared::types::{PageRequest, ProposalId, UnitId};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

use crate::context::{CycleSettings, Unit};
use crate::lineage::migrated_set;
use crate::proposal::ProposalRecord;
use crate::stage::StageLocation;
use crate::store::{
    BulkCopyRequest, HistoryQuery, ProposalStore, RecordFilter, StoreCapabilities, StoreError,
    StoreResult,
};
use crate::summary::{StageAggregate, UnitSummary};
use crate::workflow::HistoryEntry;

#[derive(Debug, Default)]
struct Tables {
    stages: HashMap<StageLocation, Vec<ProposalRecord>>,
    units: BTreeMap<UnitId, Unit>,
    summaries: BTreeMap<UnitId, UnitSummary>,
    history: Vec<HistoryEntry>,
    settings: Option<CycleSettings>,
}

/// Store keeping everything behind one `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    capabilities: StoreCapabilities,
}

impl InMemoryStore {
    /// Empty store without optional capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store advertising the given capabilities.
    #[must_use]
    pub fn with_capabilities(capabilities: StoreCapabilities) -> Self {
        Self {
            tables: RwLock::default(),
            capabilities,
        }
    }

    /// Store pre-loaded with units.
    #[must_use]
    pub fn with_units(units: impl IntoIterator<Item = Unit>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                units: units.into_iter().map(|u| (u.id.clone(), u)).collect(),
                ..Tables::default()
            }),
            capabilities: StoreCapabilities::default(),
        }
    }
}

fn check_insertable(
    existing: &[ProposalRecord],
    records: &[ProposalRecord],
) -> StoreResult<()> {
    let mut ids: HashSet<ProposalId> = existing.iter().map(|r| r.id).collect();
    let mut lineage = migrated_set(existing);
    for record in records {
        if !ids.insert(record.id) {
            return Err(StoreError::Conflict(format!(
                "duplicate proposal id {}",
                record.id
            )));
        }
        if let Some(source) = record.lineage_id {
            if !lineage.insert(source) {
                return Err(StoreError::Conflict(format!(
                    "lineage {source} already migrated"
                )));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl ProposalStore for InMemoryStore {
    fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    async fn list_records(
        &self,
        location: &StageLocation,
        filter: &RecordFilter,
    ) -> StoreResult<Vec<ProposalRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .stages
            .get(location)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_record(
        &self,
        location: &StageLocation,
        id: ProposalId,
    ) -> StoreResult<Option<ProposalRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .stages
            .get(location)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    async fn insert_records(
        &self,
        location: &StageLocation,
        records: &[ProposalRecord],
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let table = tables.stages.entry(location.clone()).or_default();
        check_insertable(table, records)?;
        table.extend_from_slice(records);
        Ok(())
    }

    async fn update_record(
        &self,
        location: &StageLocation,
        record: &ProposalRecord,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .stages
            .get_mut(location)
            .and_then(|records| records.iter_mut().find(|r| r.id == record.id))
            .ok_or_else(|| StoreError::NotFound(format!("proposal {}", record.id)))?;
        *slot = record.clone();
        Ok(())
    }

    async fn delete_record(&self, location: &StageLocation, id: ProposalId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(records) = tables.stages.get_mut(location) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| r.id != id);
        let deleted = records.len() != before;
        if deleted {
            tables.history.retain(|h| h.record_id != id);
        }
        Ok(deleted)
    }

    async fn get_unit(&self, id: &UnitId) -> StoreResult<Option<Unit>> {
        Ok(self.tables.read().await.units.get(id).cloned())
    }

    async fn list_units(&self) -> StoreResult<Vec<Unit>> {
        Ok(self.tables.read().await.units.values().cloned().collect())
    }

    async fn upsert_unit(&self, unit: &Unit) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .units
            .insert(unit.id.clone(), unit.clone());
        Ok(())
    }

    async fn set_ceiling(&self, id: &UnitId, ceiling: Decimal) -> StoreResult<Option<Unit>> {
        let mut tables = self.tables.write().await;
        Ok(tables.units.get_mut(id).map(|unit| {
            unit.ceiling = ceiling;
            unit.clone()
        }))
    }

    async fn upsert_summary(&self, summary: &UnitSummary) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .summaries
            .insert(summary.unit_id.clone(), summary.clone());
        Ok(())
    }

    async fn get_summary(&self, unit: &UnitId) -> StoreResult<Option<UnitSummary>> {
        Ok(self.tables.read().await.summaries.get(unit).cloned())
    }

    async fn list_summaries(&self) -> StoreResult<Vec<UnitSummary>> {
        Ok(self
            .tables
            .read()
            .await
            .summaries
            .values()
            .cloned()
            .collect())
    }

    async fn append_history(&self, entries: &[HistoryEntry]) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .history
            .extend_from_slice(entries);
        Ok(())
    }

    async fn list_history(
        &self,
        query: &HistoryQuery,
        page: &PageRequest,
    ) -> StoreResult<(Vec<HistoryEntry>, u64)> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&HistoryEntry> =
            tables.history.iter().filter(|h| query.matches(h)).collect();
        matching.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| b.id.cmp(&a.id)));

        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let entries = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((entries, total))
    }

    async fn load_settings(&self) -> StoreResult<CycleSettings> {
        Ok(self.tables.read().await.settings.unwrap_or_default())
    }

    async fn save_settings(&self, settings: &CycleSettings) -> StoreResult<()> {
        self.tables.write().await.settings = Some(*settings);
        Ok(())
    }

    async fn bulk_copy(&self, request: &BulkCopyRequest) -> StoreResult<Vec<ProposalRecord>> {
        if !self.capabilities.bulk_copy {
            return Err(StoreError::Unsupported("bulk_copy"));
        }

        let mut tables = self.tables.write().await;
        let filter = RecordFilter::scoped(request.unit_id.as_ref()).committed();
        let migrated = tables
            .stages
            .get(&request.destination_location)
            .map(|records| migrated_set(records))
            .unwrap_or_default();
        let copies: Vec<ProposalRecord> = tables
            .stages
            .get(&request.source_location)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(r) && !migrated.contains(&r.id))
                    .map(|r| r.carry_forward(request.destination, request.migrated_by, request.at))
                    .collect()
            })
            .unwrap_or_default();

        let destination = tables
            .stages
            .entry(request.destination_location.clone())
            .or_default();
        check_insertable(destination, &copies)?;
        destination.extend_from_slice(&copies);
        Ok(copies)
    }

    async fn aggregate_unit(
        &self,
        location: &StageLocation,
        unit: &UnitId,
    ) -> StoreResult<StageAggregate> {
        if !self.capabilities.aggregate {
            return Err(StoreError::Unsupported("aggregate_unit"));
        }

        let tables = self.tables.read().await;
        Ok(tables
            .stages
            .get(location)
            .map(|records| StageAggregate::fold(records.iter().filter(|r| r.unit_id == *unit)))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::types::fixtures::{record, with_status};
    use crate::stage::Stage;
    use crate::workflow::{HistoryAction, ReviewStatus};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn initial() -> StageLocation {
        StageLocation::for_stage(Stage::Initial)
    }

    #[tokio::test]
    async fn test_insert_get_update_delete() {
        let store = InMemoryStore::new();
        let mut r = record("U1", Stage::Initial, dec!(2), dec!(10));
        store.insert_record(&initial(), &r).await.unwrap();
        assert_eq!(store.get_record(&initial(), r.id).await.unwrap(), Some(r.clone()));

        r.total = dec!(30);
        store.update_record(&initial(), &r).await.unwrap();
        assert_eq!(
            store.get_record(&initial(), r.id).await.unwrap().unwrap().total,
            dec!(30)
        );

        assert!(store.delete_record(&initial(), r.id).await.unwrap());
        assert!(!store.delete_record(&initial(), r.id).await.unwrap());
        assert!(matches!(
            store.update_record(&initial(), &r).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_with_duplicate_lineage_writes_nothing() {
        let store = InMemoryStore::new();
        let source = record("U1", Stage::Initial, dec!(1), dec!(10));
        let dest = StageLocation::for_stage(Stage::Revision(1));
        let now = Utc::now();
        let a = source.carry_forward(Stage::Revision(1), None, now);
        let b = source.carry_forward(Stage::Revision(1), None, now);

        let err = store.insert_records(&dest, &[a.clone(), b]).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store
            .list_records(&dest, &RecordFilter::default())
            .await
            .unwrap()
            .is_empty());

        store.insert_records(&dest, &[a]).await.unwrap();
        let again = source.carry_forward(Stage::Revision(1), None, now);
        assert!(store.insert_record(&dest, &again).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_cascades_history() {
        let store = InMemoryStore::new();
        let r = record("U1", Stage::Initial, dec!(1), dec!(10));
        let other = record("U1", Stage::Initial, dec!(1), dec!(20));
        store.insert_records(&initial(), &[r.clone(), other.clone()]).await.unwrap();
        store
            .append_history(&[
                HistoryEntry::new(&r, HistoryAction::Created, None, None, Utc::now()),
                HistoryEntry::new(&other, HistoryAction::Created, None, None, Utc::now()),
            ])
            .await
            .unwrap();

        store.delete_record(&initial(), r.id).await.unwrap();
        let (entries, total) = store
            .list_history(&HistoryQuery::default(), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(entries[0].record_id, other.id);
    }

    #[tokio::test]
    async fn test_history_is_paged_newest_first() {
        let store = InMemoryStore::new();
        let r = record("U1", Stage::Initial, dec!(1), dec!(10));
        let start = Utc::now();
        let entries: Vec<_> = (0..5)
            .map(|i| {
                HistoryEntry::new(
                    &r,
                    HistoryAction::Updated,
                    None,
                    Some(format!("edit {i}")),
                    start + Duration::seconds(i),
                )
            })
            .collect();
        store.append_history(&entries).await.unwrap();

        let query = HistoryQuery {
            record_id: Some(r.id),
            ..HistoryQuery::default()
        };
        let page = PageRequest {
            page: 1,
            per_page: 2,
        };
        let (first, total) = store.list_history(&query, &page).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].detail.as_deref(), Some("edit 4"));
        assert_eq!(first[1].detail.as_deref(), Some("edit 3"));
    }

    #[tokio::test]
    async fn test_bulk_copy_is_idempotent() {
        let store = InMemoryStore::with_capabilities(StoreCapabilities {
            bulk_copy: true,
            aggregate: true,
        });
        let accepted = with_status("U1", Stage::Initial, dec!(500), ReviewStatus::Accepted);
        let pending = with_status("U1", Stage::Initial, dec!(100), ReviewStatus::PendingReview);
        store
            .insert_records(&initial(), &[accepted.clone(), pending])
            .await
            .unwrap();

        let request = BulkCopyRequest {
            source: Stage::Initial,
            source_location: initial(),
            destination: Stage::Revision(1),
            destination_location: StageLocation::for_stage(Stage::Revision(1)),
            unit_id: None,
            migrated_by: None,
            at: Utc::now(),
        };
        let copies = store.bulk_copy(&request).await.unwrap();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].lineage_id, Some(accepted.id));
        assert!(store.bulk_copy(&request).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_optional_capabilities_default_to_unsupported() {
        let store = InMemoryStore::new();
        let unit = UnitId::parse("U1").unwrap();
        assert_eq!(
            store.aggregate_unit(&initial(), &unit).await.unwrap_err(),
            StoreError::Unsupported("aggregate_unit")
        );
    }

    #[tokio::test]
    async fn test_settings_default_until_saved() {
        let store = InMemoryStore::new();
        assert_eq!(store.load_settings().await.unwrap(), CycleSettings::default());
        let settings = CycleSettings {
            active_revision: 1,
            revision_open: true,
            ..CycleSettings::default()
        };
        store.save_settings(&settings).await.unwrap();
        assert_eq!(store.load_settings().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_set_ceiling_on_unknown_unit() {
        let store = InMemoryStore::new();
        let unit = UnitId::parse("NOPE").unwrap();
        assert_eq!(store.set_ceiling(&unit, dec!(1)).await.unwrap(), None);
    }
}
