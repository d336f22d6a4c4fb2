//! API route definitions.

use axum::{Router, middleware};
use pagu_shared::types::UnitId;

use crate::{AppState, error::ApiError, middleware::auth::auth_middleware};

pub mod health;
pub mod proposals;
pub mod reports;
pub mod settings;
pub mod units;


/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(proposals::routes())
        .merge(units::routes())
        .merge(reports::routes())
        .merge(settings::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}

/// Parses a unit code taken from a path or query string.
pub(crate) fn parse_unit(raw: &str) -> Result<UnitId, ApiError> {
    UnitId::parse(raw).map_err(|e| ApiError::validation(e.to_string()))
}

/// Parses an optional unit code.
pub(crate) fn parse_optional_unit(raw: Option<&str>) -> Result<Option<UnitId>, ApiError> {
    raw.filter(|s| !s.trim().is_empty())
        .map(parse_unit)
        .transpose()
}
