//! Administrative operations: ceilings, cycle settings and migration.

use chrono::Utc;
use pagu_shared::types::UnitId;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use super::{BudgetEngine, require_administrator};
use crate::ceiling::CeilingError;
use crate::context::{CycleSettings, Unit};
use crate::error::{CoreError, CoreResult};
use crate::migration::{MigrationReport, MigrationRequest, MigrationService};
use crate::proposal::MAX_AMOUNT;
use crate::stage::{Stage, StageError};
use crate::summary::SummaryService;
use crate::workflow::Actor;

/// Partial update of the cycle settings; absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SettingsUpdate {
    /// New active revision (0 = none).
    #[serde(default)]
    pub active_revision: Option<u8>,
    /// Open or close the revision window.
    #[serde(default)]
    pub revision_open: Option<bool>,
    /// Open or close the Initial window.
    #[serde(default)]
    pub initial_open: Option<bool>,
}

impl BudgetEngine {
    /// Sets a unit's ceiling and rebuilds its summary.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotPermitted` for non-administrators
    /// * `CeilingError::Negative` / `CeilingError::AmountOutOfRange`
    /// * `CoreError::UnitNotFound`
    pub async fn set_ceiling(
        &self,
        actor: &Actor,
        unit_id: &UnitId,
        ceiling: Decimal,
    ) -> CoreResult<Unit> {
        require_administrator(actor, "set ceilings")?;
        if ceiling < Decimal::ZERO {
            return Err(CeilingError::Negative(ceiling).into());
        }
        if ceiling > MAX_AMOUNT {
            return Err(CeilingError::AmountOutOfRange(ceiling).into());
        }
        let unit = self
            .store
            .set_ceiling(unit_id, ceiling)
            .await?
            .ok_or_else(|| CoreError::UnitNotFound(unit_id.clone()))?;
        self.context.units().invalidate(unit_id);
        info!(unit_id = %unit_id, ceiling = %ceiling, "unit ceiling set");

        self.refresh_summary(unit_id).await;
        Ok(unit)
    }

    /// Current cycle settings.
    #[must_use]
    pub fn settings(&self) -> CycleSettings {
        self.context.settings()
    }

    /// Changes the cycle settings and rebuilds every summary, since the
    /// active revision decides which stages feed them.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotPermitted` for non-administrators
    /// * `StageError::RevisionOutOfRange` past the provisioned revisions
    pub async fn update_settings(
        &self,
        actor: &Actor,
        update: SettingsUpdate,
    ) -> CoreResult<CycleSettings> {
        require_administrator(actor, "change cycle settings")?;
        let current = self.context.settings();
        let max = self.context.stages().max_revision();
        let active_revision = update.active_revision.unwrap_or(current.active_revision);
        if active_revision > max {
            return Err(StageError::RevisionOutOfRange {
                number: u32::from(active_revision),
                max,
            }
            .into());
        }

        let settings = CycleSettings {
            active_revision,
            revision_open: active_revision > 0
                && update.revision_open.unwrap_or(current.revision_open),
            initial_open: update.initial_open.unwrap_or(current.initial_open),
            updated_at: Some(Utc::now()),
        };
        self.store.save_settings(&settings).await?;
        self.context.set_settings(settings);
        info!(
            active_revision = settings.active_revision,
            revision_open = settings.revision_open,
            initial_open = settings.initial_open,
            "cycle settings changed"
        );

        if settings.active_revision != current.active_revision
            && let Err(e) = SummaryService::recompute_all(self.store.as_ref(), &self.context).await
        {
            error!(error = %e, "summary rebuild after settings change failed");
        }
        Ok(settings)
    }

    /// Carries committed records into `request.destination`.
    ///
    /// # Errors
    ///
    /// See [`MigrationService::run`].
    pub async fn migrate(
        &self,
        actor: &Actor,
        request: &MigrationRequest,
    ) -> CoreResult<MigrationReport> {
        MigrationService::run(self.store.as_ref(), &self.context, actor, request).await
    }

    /// Migrates into the active revision from the stage before it.
    ///
    /// # Errors
    ///
    /// `MigrationError::NoPredecessor` while no revision is active, otherwise
    /// see [`MigrationService::run`].
    pub async fn migrate_active(
        &self,
        actor: &Actor,
        unit_id: Option<UnitId>,
    ) -> CoreResult<MigrationReport> {
        let destination = self.context.settings().active_stage().unwrap_or(Stage::Initial);
        self.migrate(
            actor,
            &MigrationRequest {
                destination,
                source: None,
                unit_id,
            },
        )
        .await
    }
}
