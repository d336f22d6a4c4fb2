//! Reporting routes: variance matrix, realization recap and dashboard.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use pagu_core::recap::RecapFilter;
use serde::Deserialize;
use serde_json::json;

use super::parse_optional_unit;
use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the reporting routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stages/{stage}/matrix", get(matrix))
        .route("/stages/{stage}/recap", get(recap))
        .route("/dashboard", get(dashboard))
}

/// Query parameters for the matrix.
#[derive(Debug, Default, Deserialize)]
pub struct MatrixQuery {
    /// Restrict to one unit.
    pub unit_id: Option<String>,
}

/// Query parameters for the recap.
#[derive(Debug, Default, Deserialize)]
pub struct RecapQuery {
    /// Restrict to one unit.
    pub unit_id: Option<String>,
    /// Restrict to one category.
    pub category: Option<String>,
    /// Restrict to one subcategory.
    pub subcategory: Option<String>,
}

/// GET `/stages/{stage}/matrix` - Before/after comparison against the previous stage.
async fn matrix(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(stage): Path<String>,
    Query(query): Query<MatrixQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let unit_id = parse_optional_unit(query.unit_id.as_deref())?;
    let report = state.engine.matrix(auth.actor(), stage, unit_id).await?;
    Ok(Json(report))
}

/// GET `/stages/{stage}/recap` - Planned vs executed per category.
async fn recap(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(stage): Path<String>,
    Query(query): Query<RecapQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stage = state.engine.resolve_stage(&stage)?;
    let filter = RecapFilter {
        unit_id: parse_optional_unit(query.unit_id.as_deref())?,
        category: query.category,
        subcategory: query.subcategory,
    };
    let rows = state.engine.recap(auth.actor(), stage, filter).await?;
    Ok(Json(json!({ "stage": stage, "rows": rows })))
}

/// GET `/dashboard` - Portfolio totals plus per-unit summaries.
async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let dashboard = state.engine.dashboard(auth.actor()).await?;
    Ok(Json(dashboard))
}
