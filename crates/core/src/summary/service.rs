//! Summary recomputation against the store.

use chrono::Utc;
use pagu_shared::types::UnitId;
use tracing::{debug, error, info};

use crate::context::BudgetContext;
use crate::error::{CoreError, CoreResult};
use crate::stage::Stage;
use crate::store::{ProposalStore, RecordFilter};
use crate::summary::aggregator::SummaryAggregator;
use crate::summary::types::UnitSummary;

/// Rebuilds and persists unit summaries.
pub struct SummaryService;

impl SummaryService {
    /// Rebuilds one unit's summary from its records and upserts it.
    ///
    /// Uses the store's aggregation capability when offered, otherwise scans
    /// the unit's records of Initial and the active revision.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnitNotFound` for unknown units and propagates
    /// store failures.
    pub async fn recompute(
        store: &dyn ProposalStore,
        context: &BudgetContext,
        unit_id: &UnitId,
    ) -> CoreResult<UnitSummary> {
        let unit = context
            .units()
            .get(store, unit_id)
            .await?
            .ok_or_else(|| CoreError::UnitNotFound(unit_id.clone()))?;
        let revision = context.settings().active_stage();
        let initial_location = context.location(Stage::Initial)?;
        let now = Utc::now();

        let summary = if store.capabilities().aggregate {
            let initial = store.aggregate_unit(initial_location, unit_id).await?;
            let revision = match revision {
                Some(stage) => Some((
                    stage,
                    store
                        .aggregate_unit(context.location(stage)?, unit_id)
                        .await?,
                )),
                None => None,
            };
            SummaryAggregator::combine(&unit, initial, revision, now)
        } else {
            let filter = RecordFilter::scoped(Some(unit_id));
            let initial = store.list_records(initial_location, &filter).await?;
            let revision = match revision {
                Some(stage) => Some((
                    stage,
                    store
                        .list_records(context.location(stage)?, &filter)
                        .await?,
                )),
                None => None,
            };
            SummaryAggregator::compute(
                &unit,
                &initial,
                revision.as_ref().map(|(stage, records)| (*stage, records.as_slice())),
                now,
            )
        };

        store.upsert_summary(&summary).await?;
        debug!(
            unit_id = %unit_id,
            current_total = %summary.current_total,
            total_planned = %summary.total_planned,
            "unit summary recomputed"
        );
        Ok(summary)
    }

    /// Recompute triggered by a committed write.
    ///
    /// The write already succeeded, so a failure here is logged and swallowed;
    /// the summary can be rebuilt later from source.
    pub async fn recompute_after_write(
        store: &dyn ProposalStore,
        context: &BudgetContext,
        unit_id: &UnitId,
    ) -> Option<UnitSummary> {
        match Self::recompute(store, context, unit_id).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!(unit_id = %unit_id, error = %e, "summary recompute failed");
                None
            }
        }
    }

    /// Rebuilds every active unit's summary.
    ///
    /// Reads each relevant stage once, folds all units in parallel and
    /// upserts row by row.
    ///
    /// # Errors
    ///
    /// Propagates store failures; rows upserted before a failure stay written.
    pub async fn recompute_all(
        store: &dyn ProposalStore,
        context: &BudgetContext,
    ) -> CoreResult<Vec<UnitSummary>> {
        context.units().invalidate_all();
        let units: Vec<_> = context
            .units()
            .list(store)
            .await?
            .iter()
            .filter(|u| u.active)
            .cloned()
            .collect();

        let all = RecordFilter::default();
        let initial_location = context.location(Stage::Initial)?;
        let revision = match context.settings().active_stage() {
            Some(stage) => Some((stage, context.location(stage)?)),
            None => None,
        };

        let (initial, revision_records) = match revision {
            Some((stage, location)) => {
                let (initial, records) = tokio::try_join!(
                    store.list_records(initial_location, &all),
                    store.list_records(location, &all),
                )?;
                (initial, Some((stage, records)))
            }
            None => (store.list_records(initial_location, &all).await?, None),
        };

        let summaries = SummaryAggregator::compute_many(
            &units,
            &initial,
            revision_records
                .as_ref()
                .map(|(stage, records)| (*stage, records.as_slice())),
            Utc::now(),
        );
        for summary in &summaries {
            store.upsert_summary(summary).await?;
        }

        info!(units = summaries.len(), "all unit summaries recomputed");
        Ok(summaries)
    }
}
