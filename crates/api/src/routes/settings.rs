//! Cycle settings routes.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use pagu_core::engine::SettingsUpdate;
use tracing::info;

use crate::{AppState, error::ApiError, middleware::AuthUser};

/// Creates the settings routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/settings/cycle", get(get_settings).put(update_settings))
}

/// GET `/settings/cycle` - Active revision and open submission windows.
async fn get_settings(State(state): State<AppState>, _auth: AuthUser) -> impl IntoResponse {
    Json(state.engine.settings())
}

/// PUT `/settings/cycle` - Change the active revision or windows (administrator).
async fn update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(update): Json<SettingsUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state.engine.update_settings(auth.actor(), update).await?;
    info!(
        active_revision = settings.active_revision,
        revision_open = settings.revision_open,
        initial_open = settings.initial_open,
        "cycle settings updated"
    );
    Ok(Json(settings))
}
