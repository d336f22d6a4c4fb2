//! Unit routes: summaries, ceilings and unit history.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
};
use pagu_shared::types::PageRequest;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::parse_unit;
use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the unit routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/summaries", get(list_summaries))
        .route("/summaries/recompute", post(recompute_all))
        .route("/units/{unit_id}/summary", get(get_summary))
        .route("/units/{unit_id}/summary/recompute", post(recompute_summary))
        .route("/units/{unit_id}/ceiling-check", get(check_ceiling))
        .route("/units/{unit_id}/ceiling", put(set_ceiling))
        .route("/units/{unit_id}/history", get(unit_history))
}

/// Query parameters for a ceiling pre-check.
#[derive(Debug, Deserialize)]
pub struct CeilingCheckQuery {
    /// Amount of the prospective submission.
    pub amount: Decimal,
}

/// Request body for setting a ceiling.
#[derive(Debug, Deserialize)]
pub struct SetCeilingRequest {
    /// New ceiling.
    pub ceiling: Decimal,
}

/// GET `/summaries` - Summaries the caller may see.
async fn list_summaries(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.engine.summaries(auth.actor()).await?;
    Ok(Json(json!({ "summaries": summaries })))
}

/// POST `/summaries/recompute` - Rebuild every unit's summary.
async fn recompute_all(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.engine.recompute_all(auth.actor()).await?;
    info!(units = summaries.len(), "summaries rebuilt");
    Ok(Json(json!({ "summaries": summaries })))
}

/// GET `/units/{unit_id}/summary` - One unit's summary.
async fn get_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(unit_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let unit_id = parse_unit(&unit_id)?;
    let summary = state.engine.summary(auth.actor(), &unit_id).await?;
    Ok(Json(summary))
}

/// POST `/units/{unit_id}/summary/recompute` - Rebuild one unit's summary.
async fn recompute_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(unit_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let unit_id = parse_unit(&unit_id)?;
    let summary = state.engine.recompute_summary(auth.actor(), &unit_id).await?;
    Ok(Json(summary))
}

/// GET `/units/{unit_id}/ceiling-check?amount=` - Would `amount` fit under the ceiling.
async fn check_ceiling(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(unit_id): Path<String>,
    Query(query): Query<CeilingCheckQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let unit_id = parse_unit(&unit_id)?;
    let check = state
        .engine
        .check_ceiling(auth.actor(), &unit_id, query.amount)
        .await?;
    Ok(Json(check))
}

/// PUT `/units/{unit_id}/ceiling` - Set a unit's ceiling (administrator).
async fn set_ceiling(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(unit_id): Path<String>,
    Json(payload): Json<SetCeilingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let unit_id = parse_unit(&unit_id)?;
    let unit = state
        .engine
        .set_ceiling(auth.actor(), &unit_id, payload.ceiling)
        .await?;
    info!(unit_id = %unit.id, ceiling = %unit.ceiling, "ceiling updated");
    Ok(Json(unit))
}

/// GET `/units/{unit_id}/history` - History of every record of a unit.
async fn unit_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(unit_id): Path<String>,
    Query(page): Query<PageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let unit_id = parse_unit(&unit_id)?;
    let entries = state
        .engine
        .unit_history(auth.actor(), &unit_id, &page)
        .await?;
    Ok(Json(entries))
}
