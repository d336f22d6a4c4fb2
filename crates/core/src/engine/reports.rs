//! Summaries, ceiling checks, matrix and recap.

use chrono::Utc;
use pagu_shared::types::UnitId;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use super::{BudgetEngine, ensure_unit_scope, read_scope, require_administrator};
use crate::ceiling::{CeilingCheck, CeilingGuard};
use crate::error::CoreResult;
use crate::migration::MigrationError;
use crate::recap::{RecapFilter, RecapRow, recap};
use crate::stage::Stage;
use crate::store::RecordFilter;
use crate::summary::{PortfolioSummary, SummaryAggregator, SummaryService, UnitSummary};
use crate::variance::{MatrixReport, VarianceComparator};
use crate::workflow::Actor;

/// Dashboard payload: portfolio totals plus the per-unit rows behind them.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// Totals over `units`.
    pub portfolio: PortfolioSummary,
    /// Visible unit summaries.
    pub units: Vec<UnitSummary>,
}

impl BudgetEngine {
    /// Ceiling check for a prospective Initial-stage amount.
    ///
    /// # Errors
    ///
    /// `CoreError::Forbidden` for another unit, `CoreError::UnitNotFound`,
    /// `CeilingError::AmountOutOfRange` for a negative or oversized amount.
    pub async fn check_ceiling(
        &self,
        actor: &Actor,
        unit_id: &UnitId,
        amount: Decimal,
    ) -> CoreResult<CeilingCheck> {
        ensure_unit_scope(actor, unit_id)?;
        let unit = self.unit(unit_id).await?;
        let existing = self
            .store
            .list_records(
                self.location(Stage::Initial)?,
                &RecordFilter::scoped(Some(unit_id)),
            )
            .await?;
        Ok(CeilingGuard::check(unit.ceiling, &existing, None, amount)?)
    }

    /// Stored summary of a unit, rebuilt first if none exists yet.
    ///
    /// # Errors
    ///
    /// `CoreError::Forbidden`, `CoreError::UnitNotFound` or store failures.
    pub async fn summary(&self, actor: &Actor, unit_id: &UnitId) -> CoreResult<UnitSummary> {
        ensure_unit_scope(actor, unit_id)?;
        match self.store.get_summary(unit_id).await? {
            Some(summary) => Ok(summary),
            None => SummaryService::recompute(self.store.as_ref(), &self.context, unit_id).await,
        }
    }

    /// Rebuilds a unit's summary from its records.
    ///
    /// # Errors
    ///
    /// `CoreError::Forbidden`, `CoreError::UnitNotFound` or store failures.
    pub async fn recompute_summary(
        &self,
        actor: &Actor,
        unit_id: &UnitId,
    ) -> CoreResult<UnitSummary> {
        ensure_unit_scope(actor, unit_id)?;
        SummaryService::recompute(self.store.as_ref(), &self.context, unit_id).await
    }

    /// Rebuilds every active unit's summary.
    ///
    /// # Errors
    ///
    /// `WorkflowError::NotPermitted` for non-administrators, store failures.
    pub async fn recompute_all(&self, actor: &Actor) -> CoreResult<Vec<UnitSummary>> {
        require_administrator(actor, "rebuild all summaries")?;
        SummaryService::recompute_all(self.store.as_ref(), &self.context).await
    }

    /// Stored summaries visible to the actor.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn summaries(&self, actor: &Actor) -> CoreResult<Vec<UnitSummary>> {
        let mut summaries = self.store.list_summaries().await?;
        summaries.retain(|s| actor.can_view(&s.unit_id));
        summaries.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));
        Ok(summaries)
    }

    /// Portfolio totals over the visible summaries.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn dashboard(&self, actor: &Actor) -> CoreResult<Dashboard> {
        let units = self.summaries(actor).await?;
        Ok(Dashboard {
            portfolio: SummaryAggregator::portfolio(&units),
            units,
        })
    }

    /// Before/after matrix of `stage` against the stage before it.
    ///
    /// # Errors
    ///
    /// * `MigrationError::NoPredecessor` for the Initial stage
    /// * `CoreError::Forbidden` when a unit user asks for another unit
    pub async fn matrix(
        &self,
        actor: &Actor,
        stage: Stage,
        unit_id: Option<UnitId>,
    ) -> CoreResult<MatrixReport> {
        let previous = stage
            .previous()
            .ok_or(MigrationError::NoPredecessor(stage))?;
        let scope = read_scope(actor, unit_id)?;
        let previous_filter = RecordFilter::scoped(scope.as_ref());
        let current_filter = RecordFilter::scoped(scope.as_ref()).committed();

        let (previous_records, current_records, units) = tokio::try_join!(
            self.store.list_records(self.location(previous)?, &previous_filter),
            self.store.list_records(self.location(stage)?, &current_filter),
            self.context.units().list(self.store.as_ref()),
        )?;
        let names: HashMap<UnitId, String> = units
            .iter()
            .map(|u| (u.id.clone(), u.name.clone()))
            .collect();

        Ok(VarianceComparator::compare(
            previous,
            stage,
            &previous_records,
            &current_records,
            &names,
            Utc::now(),
        ))
    }

    /// Realization recap of one stage.
    ///
    /// # Errors
    ///
    /// `CoreError::Forbidden` when a unit user asks for another unit.
    pub async fn recap(
        &self,
        actor: &Actor,
        stage: Stage,
        mut filter: RecapFilter,
    ) -> CoreResult<Vec<RecapRow>> {
        filter.unit_id = read_scope(actor, filter.unit_id.take())?;
        let records = self
            .store
            .list_records(
                self.location(stage)?,
                &RecordFilter {
                    category: filter.category.clone(),
                    subcategory: filter.subcategory.clone(),
                    ..RecordFilter::scoped(filter.unit_id.as_ref()).committed()
                },
            )
            .await?;
        Ok(recap(&records, &filter))
    }
}
