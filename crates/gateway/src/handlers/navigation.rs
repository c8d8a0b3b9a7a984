//! Route table lookup

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::AppState;
use mcr_common::{routes::RouteTarget, UserContext};

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub path: String,
}

/// What the UI should render at `path` for this caller
pub async fn resolve_route(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<ResolveQuery>,
) -> Json<RouteTarget> {
    Json(state.routes.resolve(&query.path, &user))
}
