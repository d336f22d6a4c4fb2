//! Runs a migration against the store.

use chrono::Utc;
use pagu_shared::types::{ProposalId, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::context::BudgetContext;
use crate::error::{CoreError, CoreResult};
use crate::lineage::check_unique;
use crate::migration::error::MigrationError;
use crate::migration::planner::{MigrationPlanner, MigrationScope};
use crate::stage::Stage;
use crate::store::{BulkCopyRequest, ProposalStore, RecordFilter, StoreError};
use crate::summary::SummaryService;
use crate::workflow::{Actor, HistoryAction, HistoryEntry};

/// A migration request as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRequest {
    /// Stage to copy into.
    pub destination: Stage,
    /// Stage to copy from; defaults to the one before `destination`.
    #[serde(default)]
    pub source: Option<Stage>,
    /// Restrict to one unit. Unit users always migrate their own unit.
    #[serde(default)]
    pub unit_id: Option<UnitId>,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Stage copied from.
    pub source: Stage,
    /// Stage copied into.
    pub destination: Stage,
    /// Number of records inserted.
    pub inserted: usize,
    /// Ids of the inserted records.
    pub inserted_ids: Vec<ProposalId>,
    /// Eligible records skipped because they had been migrated before.
    /// Unknown when the store copied server-side.
    pub skipped_already_migrated: Option<usize>,
    /// Units whose summaries were recomputed.
    pub affected_units: BTreeSet<UnitId>,
    /// True if the store performed the copy itself.
    pub server_side: bool,
}

/// Stage migration against a [`ProposalStore`].
pub struct MigrationService;

impl MigrationService {
    /// Copies every committed record of the source stage that has no successor
    /// yet into the destination stage.
    ///
    /// Running the same migration twice inserts nothing the second time.
    ///
    /// # Errors
    ///
    /// * `MigrationError` for invalid stage pairs, inactive destinations or
    ///   scopes the actor may not migrate
    /// * `StageError` for revisions beyond the provisioned range
    /// * `StoreError` if the copy fails; nothing is written in that case
    pub async fn run(
        store: &dyn ProposalStore,
        context: &BudgetContext,
        actor: &Actor,
        request: &MigrationRequest,
    ) -> CoreResult<MigrationReport> {
        let (source, destination) = MigrationPlanner::stages(request.destination, request.source)?;
        let settings = context.settings();
        if !settings.is_activated(destination) {
            return Err(MigrationError::StageNotActive {
                destination,
                active_revision: settings.active_revision,
            }
            .into());
        }
        let scope = MigrationScope::for_actor(actor, request.unit_id.clone())?;
        let source_location = context.location(source)?;
        let destination_location = context.location(destination)?;
        let now = Utc::now();

        let (copies, skipped, server_side) = if store.capabilities().bulk_copy {
            let copies = store
                .bulk_copy(&BulkCopyRequest {
                    source,
                    source_location: source_location.clone(),
                    destination,
                    destination_location: destination_location.clone(),
                    unit_id: scope.unit().cloned(),
                    migrated_by: Some(actor.user_id),
                    at: now,
                })
                .await?;
            (copies, None, true)
        } else {
            let source_filter = RecordFilter::scoped(scope.unit()).committed();
            let destination_filter = RecordFilter::scoped(scope.unit());
            let (source_records, destination_records) = tokio::try_join!(
                store.list_records(source_location, &source_filter),
                store.list_records(destination_location, &destination_filter),
            )?;

            let duplicates = check_unique(&destination_records);
            if !duplicates.is_empty() {
                warn!(
                    stage = %destination,
                    count = duplicates.len(),
                    "destination already holds duplicate lineage pointers"
                );
            }

            let plan = MigrationPlanner::plan(
                source,
                destination,
                &source_records,
                &destination_records,
                &scope,
                Some(actor.user_id),
                now,
            );
            if !plan.is_empty() {
                store
                    .insert_records(destination_location, &plan.copies)
                    .await?;
            }
            (plan.copies, Some(plan.skipped_already_migrated), false)
        };

        let history: Vec<HistoryEntry> = copies
            .iter()
            .map(|copy| {
                let detail = copy
                    .lineage_id
                    .map(|id| format!("from {source} record {id}"));
                HistoryEntry::new(copy, HistoryAction::Migrated, Some(actor), detail, now)
            })
            .collect();
        if !history.is_empty()
            && let Err(e) = store.append_history(&history).await
        {
            warn!(error = %e, "failed to record migration history");
        }

        let affected_units: BTreeSet<UnitId> = copies.iter().map(|c| c.unit_id.clone()).collect();
        for unit_id in &affected_units {
            SummaryService::recompute_after_write(store, context, unit_id).await;
        }

        info!(
            source = %source,
            destination = %destination,
            inserted = copies.len(),
            server_side,
            "stage migration finished"
        );

        Ok(MigrationReport {
            source,
            destination,
            inserted: copies.len(),
            inserted_ids: copies.iter().map(|c| c.id).collect(),
            skipped_already_migrated: skipped,
            affected_units,
            server_side,
        })
    }

    /// Stage holding a successor of `record_id`, if it was carried forward.
    ///
    /// Stages beyond the provisioned range have no successors.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn successor_stage(
        store: &dyn ProposalStore,
        context: &BudgetContext,
        stage: Stage,
        record_id: ProposalId,
    ) -> CoreResult<Option<Stage>> {
        let next = stage.next();
        let Ok(location) = context.location(next) else {
            return Ok(None);
        };
        let filter = RecordFilter {
            lineage_id: Some(record_id),
            ..RecordFilter::default()
        };
        match store.list_records(location, &filter).await {
            Ok(successors) => Ok((!successors.is_empty()).then_some(next)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(CoreError::from(e)),
        }
    }
}
