//! Proposal routes: submission, editing, review and monthly data of one stage.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use pagu_core::migration::MigrationRequest;
use pagu_core::proposal::{MonthlyAmounts, ProposalDraft};
use pagu_core::store::RecordFilter;
use pagu_core::workflow::ReviewStatus;
use pagu_shared::types::{PageRequest, ProposalId};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{parse_optional_unit, parse_unit};
use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the proposal routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/stages/{stage}/proposals",
            get(list_proposals).post(create_proposal),
        )
        .route(
            "/stages/{stage}/proposals/{id}",
            get(get_proposal)
                .put(update_proposal)
                .delete(delete_proposal),
        )
        .route("/stages/{stage}/proposals/{id}/review", post(review))
        .route("/stages/{stage}/proposals/{id}/block", post(block))
        .route("/stages/{stage}/proposals/{id}/unblock", post(unblock))
        .route("/stages/{stage}/proposals/{id}/reset", post(reset))
        .route("/stages/{stage}/proposals/{id}/plan", put(save_plan))
        .route("/stages/{stage}/proposals/{id}/execution", put(save_execution))
        .route("/stages/{stage}/proposals/{id}/history", get(history))
        .route("/stages/{stage}/migrate", post(migrate))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for listing proposals.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Owning unit; reviewers only.
    pub unit_id: Option<String>,
    /// Review status.
    pub status: Option<ReviewStatus>,
    /// Blocked flag.
    pub blocked: Option<bool>,
    /// Category.
    pub category: Option<String>,
    /// Subcategory.
    pub subcategory: Option<String>,
}

/// Query parameters for submitting a proposal.
#[derive(Debug, Default, Deserialize)]
pub struct CreateQuery {
    /// Owning unit when a reviewer submits on a unit's behalf.
    pub unit_id: Option<String>,
}

/// Request body for a review decision.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// New status.
    pub status: ReviewStatus,
    /// Reviewer note.
    pub note: Option<String>,
}

/// Request body for saving the monthly plan.
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    /// Planned amount per month.
    pub planned: MonthlyAmounts,
}

/// Request body for saving monthly execution.
#[derive(Debug, Deserialize)]
pub struct ExecutionRequest {
    /// Executed amount per month.
    pub executed: MonthlyAmounts,
}

/// Request body for migrating into a stage.
#[derive(Debug, Default, Deserialize)]
pub struct MigrateRequest {
    /// Source stage label; defaults to the stage before the destination.
    pub source: Option<String>,
    /// Restrict to one unit.
    pub unit_id: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/stages/{stage}/proposals` - List the caller's visible proposals.
async fn list_proposals(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(stage): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let filter = RecordFilter {
        unit_id: parse_optional_unit(query.unit_id.as_deref())?,
        status: query.status,
        blocked: query.blocked,
        lineage_id: None,
        category: query.category,
        subcategory: query.subcategory,
    };
    let proposals = state
        .engine
        .list_proposals(auth.actor(), stage, filter)
        .await?;
    Ok(Json(json!({ "stage": stage, "proposals": proposals })))
}

/// POST `/stages/{stage}/proposals` - Submit a proposal.
async fn create_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(stage): Path<String>,
    Query(query): Query<CreateQuery>,
    Json(draft): Json<ProposalDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let unit_id = parse_optional_unit(query.unit_id.as_deref())?;
    let record = state
        .engine
        .create_proposal(auth.actor(), stage, unit_id, draft)
        .await?;
    info!(proposal_id = %record.id, unit_id = %record.unit_id, stage = %stage, "proposal submitted");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET `/stages/{stage}/proposals/{id}` - One proposal.
async fn get_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((stage, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let record = state
        .engine
        .get_proposal(auth.actor(), stage, ProposalId::from_uuid(id))
        .await?;
    Ok(Json(record))
}

/// PUT `/stages/{stage}/proposals/{id}` - Edit a proposal.
async fn update_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((stage, id)): Path<(String, Uuid)>,
    Json(draft): Json<ProposalDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let record = state
        .engine
        .update_proposal(auth.actor(), stage, ProposalId::from_uuid(id), draft)
        .await?;
    Ok(Json(record))
}

/// DELETE `/stages/{stage}/proposals/{id}` - Delete a proposal.
async fn delete_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((stage, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    state
        .engine
        .delete_proposal(auth.actor(), stage, ProposalId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/stages/{stage}/proposals/{id}/review` - Record a review decision.
async fn review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((stage, id)): Path<(String, Uuid)>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let record = state
        .engine
        .review(
            auth.actor(),
            stage,
            ProposalId::from_uuid(id),
            payload.status,
            payload.note,
        )
        .await?;
    Ok(Json(record))
}

/// POST `/stages/{stage}/proposals/{id}/block` - Exclude from aggregation.
async fn block(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((stage, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    set_blocked(&state, &auth, &stage, id, true).await
}

/// POST `/stages/{stage}/proposals/{id}/unblock` - Include in aggregation again.
async fn unblock(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((stage, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    set_blocked(&state, &auth, &stage, id, false).await
}

async fn set_blocked(
    state: &AppState,
    auth: &AuthUser,
    stage: &str,
    id: Uuid,
    blocked: bool,
) -> Result<Json<pagu_core::proposal::ProposalRecord>, ApiError> {
    let stage = state.engine.resolve_stage(stage)?;
    let record = state
        .engine
        .set_blocked(auth.actor(), stage, ProposalId::from_uuid(id), blocked)
        .await?;
    Ok(Json(record))
}

/// POST `/stages/{stage}/proposals/{id}/reset` - Send back to review.
async fn reset(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((stage, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let record = state
        .engine
        .reset_status(auth.actor(), stage, ProposalId::from_uuid(id))
        .await?;
    Ok(Json(record))
}

/// PUT `/stages/{stage}/proposals/{id}/plan` - Save the monthly plan.
async fn save_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((stage, id)): Path<(String, Uuid)>,
    Json(payload): Json<PlanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let record = state
        .engine
        .save_monthly_plan(auth.actor(), stage, ProposalId::from_uuid(id), payload.planned)
        .await?;
    Ok(Json(record))
}

/// PUT `/stages/{stage}/proposals/{id}/execution` - Save monthly execution.
async fn save_execution(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((stage, id)): Path<(String, Uuid)>,
    Json(payload): Json<ExecutionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let record = state
        .engine
        .save_monthly_execution(
            auth.actor(),
            stage,
            ProposalId::from_uuid(id),
            payload.executed,
        )
        .await?;
    Ok(Json(record))
}

/// GET `/stages/{stage}/proposals/{id}/history` - Change history, newest first.
async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((stage, id)): Path<(String, Uuid)>,
    Query(page): Query<PageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let entries = state
        .engine
        .history(auth.actor(), stage, ProposalId::from_uuid(id), &page)
        .await?;
    Ok(Json(entries))
}

/// POST `/stages/{stage}/migrate` - Carry committed records into `stage`.
async fn migrate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(stage): Path<String>,
    payload: Option<Json<MigrateRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload.unwrap_or_default();
    let destination = state.engine.resolve_stage(&stage)?;
    let source = payload
        .source
        .as_deref()
        .map(|label| state.engine.resolve_stage(label))
        .transpose()?;
    let unit_id = payload
        .unit_id
        .as_deref()
        .map(parse_unit)
        .transpose()?;

    let report = state
        .engine
        .migrate(
            auth.actor(),
            &MigrationRequest {
                destination,
                source,
                unit_id,
            },
        )
        .await?;
    Ok(Json(report))
}
