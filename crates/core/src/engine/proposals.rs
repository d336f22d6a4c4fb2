//! Proposal lifecycle operations.

use chrono::Utc;
use pagu_shared::types::{PageRequest, PageResponse, ProposalId, UnitId};
use rust_decimal::Decimal;
use tracing::info;

use super::{BudgetEngine, ensure_unit_scope, read_scope, target_unit};
use crate::ceiling::CeilingGuard;
use crate::error::{CoreError, CoreResult};
use crate::proposal::validation::monthly_total;
use crate::proposal::{MonthlyAmounts, ProposalDraft, ProposalError, ProposalRecord};
use crate::stage::Stage;
use crate::store::{HistoryQuery, RecordFilter};
use crate::workflow::{
    Actor, HistoryAction, HistoryEntry, ReviewStatus, WorkflowAction, WorkflowService,
};

impl BudgetEngine {
    /// Submits a new proposal into `stage`.
    ///
    /// Unit users submit for their own unit while the stage's window is open;
    /// reviewers name the unit and may submit into any activated stage.
    /// Initial-stage submissions must fit under the unit's ceiling.
    ///
    /// # Errors
    ///
    /// * `CoreError::StageNotActive` / `CoreError::StageClosed`
    /// * `ProposalError` for invalid input
    /// * `CeilingError::Exceeded` with the projected total; nothing is written
    pub async fn create_proposal(
        &self,
        actor: &Actor,
        stage: Stage,
        unit_id: Option<UnitId>,
        draft: ProposalDraft,
    ) -> CoreResult<ProposalRecord> {
        let settings = self.context.settings();
        if !settings.is_activated(stage) {
            return Err(CoreError::StageNotActive(stage));
        }
        if !actor.is_reviewer() && !settings.accepts_submissions(stage) {
            return Err(CoreError::StageClosed(stage));
        }
        let unit_id = target_unit(actor, unit_id)?;
        let location = self.location(stage)?;
        let input = draft.validate()?;
        let unit = self.unit(&unit_id).await?;

        let _permit = self.ceiling_permit(stage, &unit_id).await;
        if stage.is_initial() {
            let existing = self
                .store
                .list_records(location, &RecordFilter::scoped(Some(&unit_id)))
                .await?;
            CeilingGuard::check(unit.ceiling, &existing, None, input.total)?.into_result()?;
        }

        let now = Utc::now();
        let record = ProposalRecord::new(unit_id, stage, input, Some(actor.user_id), now);
        self.store.insert_record(location, &record).await?;
        info!(
            record_id = %record.id,
            unit_id = %record.unit_id,
            stage = %stage,
            total = %record.total,
            "proposal created"
        );

        self.log_history(&[HistoryEntry::new(
            &record,
            HistoryAction::Created,
            Some(actor),
            Some(format!("total {}", record.total)),
            now,
        )])
        .await;
        self.refresh_summary(&record.unit_id).await;
        Ok(record)
    }

    /// Replaces the content of a proposal; status and lineage stay as they are.
    ///
    /// A draft without a plan keeps the current plan.
    ///
    /// # Errors
    ///
    /// * `CoreError::ProposalNotFound`, `CoreError::Superseded`
    /// * `WorkflowError::NotOwner` / `WorkflowError::CannotEditAccepted`
    /// * `ProposalError` for invalid input or a plan that no longer fits
    /// * `CeilingError::Exceeded` for Initial-stage edits above the ceiling
    pub async fn update_proposal(
        &self,
        actor: &Actor,
        stage: Stage,
        id: ProposalId,
        draft: ProposalDraft,
    ) -> CoreResult<ProposalRecord> {
        let (mut record, _permit) = self.fetch_guarded(stage, id).await?;
        WorkflowService::ensure_can_edit(&record, actor)?;
        self.ensure_not_superseded(&record).await?;

        let keep_plan = draft.planned.is_none();
        let mut input = draft.validate()?;
        if keep_plan {
            input.planned = record.planned;
        }
        check_plan(record.status, &input.planned, input.total)?;

        if stage.is_initial() && record.is_active() {
            let unit = self.unit(&record.unit_id).await?;
            let existing = self
                .store
                .list_records(
                    self.location(stage)?,
                    &RecordFilter::scoped(Some(&record.unit_id)),
                )
                .await?;
            CeilingGuard::check(unit.ceiling, &existing, Some(record.id), input.total)?
                .into_result()?;
        }

        let previous_total = record.total;
        let now = Utc::now();
        record.apply(input, now);
        self.store
            .update_record(self.location(stage)?, &record)
            .await?;

        self.log_history(&[HistoryEntry::new(
            &record,
            HistoryAction::Updated,
            Some(actor),
            Some(format!("total {previous_total} -> {}", record.total)),
            now,
        )])
        .await;
        self.refresh_summary(&record.unit_id).await;
        Ok(record)
    }

    /// Deletes a proposal and its history.
    ///
    /// # Errors
    ///
    /// Same ownership rules as [`BudgetEngine::update_proposal`].
    pub async fn delete_proposal(
        &self,
        actor: &Actor,
        stage: Stage,
        id: ProposalId,
    ) -> CoreResult<()> {
        let record = self.fetch(stage, id).await?;
        WorkflowService::ensure_can_delete(&record, actor)?;
        self.ensure_not_superseded(&record).await?;

        if !self.store.delete_record(self.location(stage)?, id).await? {
            return Err(CoreError::ProposalNotFound { stage, id });
        }
        info!(record_id = %id, unit_id = %record.unit_id, stage = %stage, "proposal deleted");

        self.log_history(&[HistoryEntry::new(
            &record,
            HistoryAction::Deleted,
            Some(actor),
            Some(format!("total {}", record.total)),
            Utc::now(),
        )])
        .await;
        self.refresh_summary(&record.unit_id).await;
        Ok(())
    }

    /// Reads one proposal.
    ///
    /// # Errors
    ///
    /// `CoreError::ProposalNotFound`, or `WorkflowError::NotOwner` for
    /// another unit's record.
    pub async fn get_proposal(
        &self,
        actor: &Actor,
        stage: Stage,
        id: ProposalId,
    ) -> CoreResult<ProposalRecord> {
        let record = self.fetch(stage, id).await?;
        WorkflowService::ensure_can_view(&record, actor)?;
        Ok(record)
    }

    /// Lists the proposals of a stage. Unit users only see their own unit.
    ///
    /// # Errors
    ///
    /// `CoreError::Forbidden` when a unit user asks for another unit.
    pub async fn list_proposals(
        &self,
        actor: &Actor,
        stage: Stage,
        mut filter: RecordFilter,
    ) -> CoreResult<Vec<ProposalRecord>> {
        filter.unit_id = read_scope(actor, filter.unit_id.take())?;
        let mut records = self
            .store
            .list_records(self.location(stage)?, &filter)
            .await?;
        records.sort_by(|a, b| {
            a.unit_id
                .cmp(&b.unit_id)
                .then_with(|| a.submitted_at.cmp(&b.submitted_at))
        });
        Ok(records)
    }

    /// Records a reviewer decision with an optional note.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotPermitted` / `WorkflowError::InvalidTransition`
    pub async fn review(
        &self,
        actor: &Actor,
        stage: Stage,
        id: ProposalId,
        decision: ReviewStatus,
        note: Option<String>,
    ) -> CoreResult<ProposalRecord> {
        let mut record = self.fetch(stage, id).await?;
        let action = WorkflowService::review(record.status, decision, actor, note)?;

        if let WorkflowAction::Review {
            note, reviewed_at, ..
        } = &action
        {
            record.reviewer_note.clone_from(note);
            record.updated_at = *reviewed_at;
        }
        record.status = action.new_status();
        self.store
            .update_record(self.location(stage)?, &record)
            .await?;
        info!(
            record_id = %id,
            stage = %stage,
            status = %record.status,
            "proposal reviewed"
        );

        self.log_history(&[HistoryEntry::for_action(&record, &action, actor)])
            .await;
        self.refresh_summary(&record.unit_id).await;
        Ok(record)
    }

    /// Sends an Accepted or Rejected proposal back to review.
    ///
    /// Reinstating a Rejected Initial record counts it against the ceiling
    /// again, so the ceiling is re-checked first.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotPermitted` / `WorkflowError::InvalidTransition`
    /// * `CeilingError::Exceeded`
    pub async fn reset_status(
        &self,
        actor: &Actor,
        stage: Stage,
        id: ProposalId,
    ) -> CoreResult<ProposalRecord> {
        let (mut record, _permit) = self.fetch_guarded(stage, id).await?;
        let action = WorkflowService::reset(record.status, actor)?;

        if stage.is_initial() && record.status == ReviewStatus::Rejected && !record.blocked {
            let unit = self.unit(&record.unit_id).await?;
            let existing = self
                .store
                .list_records(
                    self.location(stage)?,
                    &RecordFilter::scoped(Some(&record.unit_id)),
                )
                .await?;
            CeilingGuard::check(unit.ceiling, &existing, Some(record.id), record.total)?
                .into_result()?;
        }

        record.status = action.new_status();
        record.updated_at = Utc::now();
        self.store
            .update_record(self.location(stage)?, &record)
            .await?;

        self.log_history(&[HistoryEntry::for_action(&record, &action, actor)])
            .await;
        self.refresh_summary(&record.unit_id).await;
        Ok(record)
    }

    /// Sets or clears the blocked flag. Setting it to its current value
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotPermitted`
    /// * `WorkflowError::BlockRequiresAccepted`
    pub async fn set_blocked(
        &self,
        actor: &Actor,
        stage: Stage,
        id: ProposalId,
        blocked: bool,
    ) -> CoreResult<ProposalRecord> {
        let mut record = self.fetch(stage, id).await?;
        let action = WorkflowService::set_blocked(&record, blocked, actor)?;
        if record.blocked == blocked {
            return Ok(record);
        }

        record.blocked = blocked;
        record.updated_at = Utc::now();
        self.store
            .update_record(self.location(stage)?, &record)
            .await?;
        info!(record_id = %id, stage = %stage, blocked, "proposal block flag changed");

        self.log_history(&[HistoryEntry::for_action(&record, &action, actor)])
            .await;
        self.refresh_summary(&record.unit_id).await;
        Ok(record)
    }

    /// Saves the monthly disbursement plan.
    ///
    /// For an Accepted record the plan must add up to the total (or be
    /// empty); otherwise it may not exceed the total.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotOwner` / `WorkflowError::PlanOnRejected`
    /// * `ProposalError::NegativeMonthly`, `MonthlyOutOfRange`, `PlanMismatch`,
    ///   `PlanExceedsTotal`
    pub async fn save_monthly_plan(
        &self,
        actor: &Actor,
        stage: Stage,
        id: ProposalId,
        planned: MonthlyAmounts,
    ) -> CoreResult<ProposalRecord> {
        let mut record = self.fetch(stage, id).await?;
        WorkflowService::ensure_can_plan(&record, actor)?;
        self.ensure_not_superseded(&record).await?;
        check_plan(record.status, &planned, record.total)?;

        let now = Utc::now();
        record.planned = planned;
        record.updated_at = now;
        self.store
            .update_record(self.location(stage)?, &record)
            .await?;

        self.log_history(&[HistoryEntry::new(
            &record,
            HistoryAction::PlanSaved,
            Some(actor),
            Some(format!("planned {}", planned.total())),
            now,
        )])
        .await;
        self.refresh_summary(&record.unit_id).await;
        Ok(record)
    }

    /// Saves the monthly execution of a committed record.
    ///
    /// # Errors
    ///
    /// * `WorkflowError::NotOwner` / `WorkflowError::ExecutionRequiresCommitted`
    /// * `ProposalError::NegativeMonthly` / `ProposalError::MonthlyOutOfRange`
    pub async fn save_monthly_execution(
        &self,
        actor: &Actor,
        stage: Stage,
        id: ProposalId,
        executed: MonthlyAmounts,
    ) -> CoreResult<ProposalRecord> {
        let mut record = self.fetch(stage, id).await?;
        WorkflowService::ensure_can_execute(&record, actor)?;
        let executed_total = monthly_total(&executed, "executed")?;

        let now = Utc::now();
        record.executed = executed;
        record.updated_at = now;
        self.store
            .update_record(self.location(stage)?, &record)
            .await?;

        self.log_history(&[HistoryEntry::new(
            &record,
            HistoryAction::ExecutionSaved,
            Some(actor),
            Some(format!("executed {executed_total}")),
            now,
        )])
        .await;
        self.refresh_summary(&record.unit_id).await;
        Ok(record)
    }

    /// History of one proposal, newest first.
    ///
    /// # Errors
    ///
    /// `CoreError::ProposalNotFound`, or `WorkflowError::NotOwner`.
    pub async fn history(
        &self,
        actor: &Actor,
        stage: Stage,
        id: ProposalId,
        page: &PageRequest,
    ) -> CoreResult<PageResponse<HistoryEntry>> {
        let record = self.fetch(stage, id).await?;
        WorkflowService::ensure_can_view(&record, actor)?;
        let page = page.normalized();
        let query = HistoryQuery {
            record_id: Some(id),
            stage: Some(stage),
            ..HistoryQuery::default()
        };
        let (entries, total) = self.store.list_history(&query, &page).await?;
        Ok(PageResponse::new(entries, page.page, page.per_page, total))
    }

    /// History of every proposal of a unit, newest first.
    ///
    /// # Errors
    ///
    /// `CoreError::Forbidden` for another unit.
    pub async fn unit_history(
        &self,
        actor: &Actor,
        unit_id: &UnitId,
        page: &PageRequest,
    ) -> CoreResult<PageResponse<HistoryEntry>> {
        ensure_unit_scope(actor, unit_id)?;
        let page = page.normalized();
        let query = HistoryQuery {
            unit_id: Some(unit_id.clone()),
            ..HistoryQuery::default()
        };
        let (entries, total) = self.store.list_history(&query, &page).await?;
        Ok(PageResponse::new(entries, page.page, page.per_page, total))
    }
}

fn check_plan(
    status: ReviewStatus,
    planned: &MonthlyAmounts,
    total: Decimal,
) -> Result<(), ProposalError> {
    let sum = monthly_total(planned, "planned")?;
    if status == ReviewStatus::Accepted {
        if !planned.is_zero() && sum != total {
            return Err(ProposalError::PlanMismatch {
                planned: sum,
                total,
            });
        }
    } else if sum > total {
        return Err(ProposalError::PlanExceedsTotal {
            planned: sum,
            total,
        });
    }
    Ok(())
}
