//! Report handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{existing_report_key, report_key, report_scope};
use crate::AppState;
use mcr_common::{
    autosave::{AutosaveOutcome, AutosaveRequest},
    errors::Result,
    reports::{CreateReport, Report, ReportMetadata, UpdateReport},
    UserContext,
};

/// List a state's reports of one type
pub async fn list_reports(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state)): Path<(String, String)>,
) -> Result<Json<Vec<ReportMetadata>>> {
    let (report_type, report_state) = report_scope(&report_type, &report_state)?;
    let reports = state
        .reports
        .fetch_reports_by_state(&user, report_type, &report_state)
        .await?;
    Ok(Json(reports))
}

/// Start a report (add a program)
pub async fn create_report(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state)): Path<(String, String)>,
    Json(request): Json<CreateReport>,
) -> Result<(StatusCode, Json<Report>)> {
    let (report_type, report_state) = report_scope(&report_type, &report_state)?;
    let report = state
        .reports
        .create_report(&user, report_type, &report_state, request)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn get_report(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state, id)): Path<(String, String, String)>,
) -> Result<Json<Report>> {
    let key = report_key(&report_type, &report_state, &id)?;
    Ok(Json(state.reports.fetch_report(&user, &key).await?))
}

pub async fn update_report(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state, id)): Path<(String, String, String)>,
    Json(request): Json<UpdateReport>,
) -> Result<Json<Report>> {
    let key = report_key(&report_type, &report_state, &id)?;
    Ok(Json(state.reports.update_report(&user, &key, request).await?))
}

/// Write the changed fields of a page on blur
pub async fn autosave(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state, id)): Path<(String, String, String)>,
    Json(request): Json<AutosaveRequest>,
) -> Result<Json<AutosaveOutcome>> {
    let key = report_key(&report_type, &report_state, &id)?;
    Ok(Json(state.reports.autosave(&user, &key, request).await?))
}

/// Archive a report (admin only)
///
/// Permission is checked before the path is looked at, so non-admins get
/// 403 whatever the path names.
pub async fn archive_report(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state, id)): Path<(String, String, String)>,
) -> Result<Json<Report>> {
    user.require_admin()?;
    let key = existing_report_key(&report_type, &report_state, &id)?;
    Ok(Json(state.reports.archive_report(&user, &key).await?))
}

pub async fn submit_report(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state, id)): Path<(String, String, String)>,
) -> Result<Json<Report>> {
    let key = report_key(&report_type, &report_state, &id)?;
    Ok(Json(state.reports.submit_report(&user, &key).await?))
}
