//! Dashboard handler

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;

use crate::AppState;
use mcr_common::{
    dashboard::{build_dashboard, resolve_active_state},
    errors::Result,
    reports::{parse_state, ReportType},
    UserContext,
};

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub state: Option<String>,
}

/// Report rows for the active state, with the actions the caller may take
///
/// Callers with no state to show are sent home.
pub async fn dashboard(
    State(state): State<AppState>,
    user: UserContext,
    Path(report_type): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response> {
    let report_type: ReportType = report_type.parse()?;
    let Some(active_state) = resolve_active_state(&user, query.state.as_deref()) else {
        tracing::debug!(user_id = %user.user_id, "No active state, redirecting home");
        return Ok(Redirect::to("/").into_response());
    };
    let active_state = parse_state(&active_state)?;

    let reports = state
        .reports
        .fetch_reports_by_state(&user, report_type, &active_state)
        .await?;

    let template = state.reports.forms().require_template(report_type.as_str())?;
    let enter_path = template
        .first_page_path()
        .unwrap_or_else(|| report_type.base_path());

    let view = build_dashboard(&user, report_type, &active_state, reports, enter_path);
    Ok(Json(view).into_response())
}
