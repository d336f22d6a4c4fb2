//! Explicit budget context.
//!
//! Holds what every component needs to know about the running cycle: the
//! stage table, the cycle settings and the cached unit master list. It is
//! loaded once at startup, refreshed after settings changes and torn down
//! with [`BudgetContext::invalidate`].

pub mod settings;
pub mod units;

use pagu_shared::CycleConfig;
use std::sync::{PoisonError, RwLock};
use tracing::info;

use crate::stage::{Stage, StageError, StageLocation, StageTable};
use crate::store::{ProposalStore, StoreResult};

pub use settings::{CycleSettings, Unit};
pub use units::UnitDirectory;

/// Cycle-wide state shared by all requests.
pub struct BudgetContext {
    stages: StageTable,
    strict_labels: bool,
    settings: RwLock<CycleSettings>,
    units: UnitDirectory,
}

impl BudgetContext {
    /// Builds a context with default settings.
    #[must_use]
    pub fn new(config: &CycleConfig) -> Self {
        Self {
            stages: StageTable::new(config.max_revision),
            strict_labels: config.strict_stage_labels,
            settings: RwLock::new(CycleSettings::default()),
            units: UnitDirectory::new(config.master_cache_ttl_secs),
        }
    }

    /// Builds a context and loads the settings from `store`.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn load(store: &dyn ProposalStore, config: &CycleConfig) -> StoreResult<Self> {
        let context = Self::new(config);
        context.refresh(store).await?;
        Ok(context)
    }

    /// Reloads settings and drops cached units.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn refresh(&self, store: &dyn ProposalStore) -> StoreResult<()> {
        let settings = store.load_settings().await?;
        self.set_settings(settings);
        self.units.invalidate_all();
        info!(
            active_revision = settings.active_revision,
            revision_open = settings.revision_open,
            "budget context refreshed"
        );
        Ok(())
    }

    /// Drops all cached state.
    pub fn invalidate(&self) {
        self.units.invalidate_all();
    }

    /// Snapshot of the cycle settings.
    #[must_use]
    pub fn settings(&self) -> CycleSettings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the cached settings (after they were saved to the store).
    pub fn set_settings(&self, settings: CycleSettings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// The stage table.
    #[must_use]
    pub const fn stages(&self) -> &StageTable {
        &self.stages
    }

    /// Unit master list.
    #[must_use]
    pub const fn units(&self) -> &UnitDirectory {
        &self.units
    }

    /// Resolves a stage label with the configured strictness.
    ///
    /// # Errors
    ///
    /// Returns `StageError` for unresolvable labels in strict mode.
    pub fn resolve_stage(&self, label: &str) -> Result<Stage, StageError> {
        self.stages.resolve_with(label, self.strict_labels)
    }

    /// Storage location of `stage`.
    ///
    /// # Errors
    ///
    /// Returns `StageError::RevisionOutOfRange` for unprovisioned revisions.
    pub fn location(&self, stage: Stage) -> Result<&StageLocation, StageError> {
        self.stages.location(stage)
    }

    /// Stage units currently submit into.
    #[must_use]
    pub fn working_stage(&self) -> Stage {
        self.settings().working_stage()
    }

    /// Stages feeding unit summaries.
    #[must_use]
    pub fn relevant_stages(&self) -> Vec<Stage> {
        self.settings().relevant_stages()
    }
}
