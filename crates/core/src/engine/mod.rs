//! Budget engine: the operations callers invoke.
//!
//! Each mutation validates against the workflow and ceiling rules, writes
//! through the [`ProposalStore`], appends history and then rebuilds the owning
//! unit's summary. Summary and history failures after a successful write are
//! logged, not returned.

mod admin;
mod proposals;
mod reports;

#[cfg(test)]
mod tests;

use pagu_shared::config::CycleConfig;
use pagu_shared::types::{ProposalId, UnitId};
use std::sync::Arc;
use tracing::warn;

use crate::ceiling::{CeilingLocks, CeilingPermit};
use crate::context::{BudgetContext, Unit};
use crate::error::{CoreError, CoreResult};
use crate::migration::MigrationService;
use crate::proposal::ProposalRecord;
use crate::stage::{Stage, StageLocation};
use crate::store::ProposalStore;
use crate::summary::SummaryService;
use crate::workflow::{Actor, HistoryEntry, WorkflowError};

pub use admin::SettingsUpdate;
pub use reports::Dashboard;

/// Orchestrates every budget operation over one store and one cycle context.
#[derive(Clone)]
pub struct BudgetEngine {
    store: Arc<dyn ProposalStore>,
    context: Arc<BudgetContext>,
    ceiling_locks: Arc<CeilingLocks>,
}

impl std::fmt::Debug for BudgetEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetEngine")
            .field("settings", &self.context.settings())
            .finish_non_exhaustive()
    }
}

impl BudgetEngine {
    /// Creates an engine over an already loaded context.
    #[must_use]
    pub fn new(store: Arc<dyn ProposalStore>, context: Arc<BudgetContext>) -> Self {
        Self {
            store,
            context,
            ceiling_locks: Arc::new(CeilingLocks::new()),
        }
    }

    /// Creates an engine and loads the cycle settings from `store`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn load(store: Arc<dyn ProposalStore>, config: &CycleConfig) -> CoreResult<Self> {
        let context = BudgetContext::load(store.as_ref(), config).await?;
        Ok(Self::new(store, Arc::new(context)))
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &dyn ProposalStore {
        self.store.as_ref()
    }

    /// The cycle context.
    #[must_use]
    pub fn context(&self) -> &BudgetContext {
        &self.context
    }

    /// Resolves a stage label with the configured strictness.
    ///
    /// # Errors
    ///
    /// Returns `StageError` for unresolvable labels.
    pub fn resolve_stage(&self, label: &str) -> CoreResult<Stage> {
        Ok(self.context.resolve_stage(label)?)
    }

    fn location(&self, stage: Stage) -> CoreResult<&StageLocation> {
        Ok(self.context.location(stage)?)
    }

    async fn fetch(&self, stage: Stage, id: ProposalId) -> CoreResult<ProposalRecord> {
        self.store
            .get_record(self.location(stage)?, id)
            .await?
            .ok_or(CoreError::ProposalNotFound { stage, id })
    }

    async fn unit(&self, id: &UnitId) -> CoreResult<Unit> {
        self.context
            .units()
            .get(self.store.as_ref(), id)
            .await?
            .ok_or_else(|| CoreError::UnitNotFound(id.clone()))
    }

    /// Superseded records are reference data for lineage and variance.
    async fn ensure_not_superseded(&self, record: &ProposalRecord) -> CoreResult<()> {
        match MigrationService::successor_stage(
            self.store.as_ref(),
            &self.context,
            record.stage,
            record.id,
        )
        .await?
        {
            Some(successor) => Err(CoreError::Superseded {
                id: record.id,
                successor,
            }),
            None => Ok(()),
        }
    }

    /// Serializes ceiling-checked writes for one unit; only Initial is capped.
    async fn ceiling_permit(&self, stage: Stage, unit_id: &UnitId) -> Option<CeilingPermit> {
        if stage.is_initial() {
            Some(self.ceiling_locks.acquire(unit_id).await)
        } else {
            None
        }
    }

    /// Reads a record with its unit's ceiling permit held for Initial-stage
    /// writes. A record's unit never changes, so the permit taken after the
    /// first read covers the re-read.
    async fn fetch_guarded(
        &self,
        stage: Stage,
        id: ProposalId,
    ) -> CoreResult<(ProposalRecord, Option<CeilingPermit>)> {
        if !stage.is_initial() {
            return Ok((self.fetch(stage, id).await?, None));
        }
        let unit_id = self.fetch(stage, id).await?.unit_id;
        let permit = self.ceiling_permit(stage, &unit_id).await;
        let record = self.fetch(stage, id).await?;
        Ok((record, permit))
    }

    async fn log_history(&self, entries: &[HistoryEntry]) {
        if let Err(e) = self.store.append_history(entries).await {
            warn!(error = %e, entries = entries.len(), "failed to append proposal history");
        }
    }

    async fn refresh_summary(&self, unit_id: &UnitId) {
        SummaryService::recompute_after_write(self.store.as_ref(), &self.context, unit_id).await;
    }
}

fn ensure_unit_scope(actor: &Actor, unit: &UnitId) -> CoreResult<()> {
    if actor.can_view(unit) {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "unit {unit} is outside the caller's scope"
        )))
    }
}

fn require_reviewer(actor: &Actor, action: &'static str) -> Result<(), WorkflowError> {
    if actor.is_reviewer() {
        Ok(())
    } else {
        Err(WorkflowError::NotPermitted {
            action,
            role: actor.role,
        })
    }
}

fn require_administrator(actor: &Actor, action: &'static str) -> Result<(), WorkflowError> {
    if actor.is_administrator() {
        Ok(())
    } else {
        Err(WorkflowError::NotPermitted {
            action,
            role: actor.role,
        })
    }
}

/// Unit a request acts on: unit users always act for their own unit,
/// reviewers name it explicitly.
fn target_unit(actor: &Actor, requested: Option<UnitId>) -> CoreResult<UnitId> {
    match (&actor.unit, requested) {
        (Some(own), None) if !actor.is_reviewer() => Ok(own.clone()),
        (_, Some(unit)) => {
            ensure_unit_scope(actor, &unit)?;
            Ok(unit)
        }
        (_, None) => Err(crate::proposal::ProposalError::MissingField("unit_id").into()),
    }
}

/// Unit scope for reads: unit users see their own unit only.
fn read_scope(actor: &Actor, requested: Option<UnitId>) -> CoreResult<Option<UnitId>> {
    if actor.is_reviewer() {
        return Ok(requested);
    }
    target_unit(actor, requested).map(Some)
}
