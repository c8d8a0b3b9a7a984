//! Dashboard view and role gating
//!
//! Which report rows a caller sees and which actions each row offers.

use crate::auth::{UserContext, UserRole};
use crate::reports::{ReportMetadata, ReportStatus, ReportType};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub fn can_archive(role: UserRole) -> bool {
    role == UserRole::Admin
}

pub fn can_edit_program(role: UserRole) -> bool {
    role.is_state_level()
}

pub fn can_add_program(role: UserRole) -> bool {
    role.is_state_level()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardAction {
    Enter,
    EditProgram,
    Archive,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRow {
    pub id: String,
    pub program_name: String,
    pub due_date: String,
    pub last_altered: DateTime<Utc>,
    pub last_altered_by: String,
    pub status: ReportStatus,
    pub archived: bool,
    /// First report page; where "Enter" navigates
    pub enter_path: String,
    pub actions: Vec<DashboardAction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub report_type: ReportType,
    pub state: String,
    pub can_add_program: bool,
    pub empty: bool,
    pub rows: Vec<DashboardRow>,
}

/// Actions a role may take on one report row
pub fn row_actions(role: UserRole, report: &ReportMetadata) -> Vec<DashboardAction> {
    let mut actions = vec![DashboardAction::Enter];
    if can_edit_program(role) && !report.archived {
        actions.push(DashboardAction::EditProgram);
    }
    if can_archive(role) && !report.archived {
        actions.push(DashboardAction::Archive);
    }
    actions
}

pub fn build_dashboard(
    user: &UserContext,
    report_type: ReportType,
    state: &str,
    reports: Vec<ReportMetadata>,
    enter_path: &str,
) -> DashboardView {
    let rows: Vec<_> = reports
        .into_iter()
        .map(|report| DashboardRow {
            actions: row_actions(user.role, &report),
            enter_path: enter_path.to_string(),
            id: report.id,
            program_name: report.program_name,
            due_date: report.due_date,
            last_altered: report.last_altered,
            last_altered_by: report.last_altered_by,
            status: report.status,
            archived: report.archived,
        })
        .collect();

    DashboardView {
        report_type,
        state: state.to_string(),
        can_add_program: can_add_program(user.role),
        empty: rows.is_empty(),
        rows,
    }
}

/// State whose reports the dashboard shows
///
/// State-level users always see their own state; other roles pick one.
/// `None` means there is nothing to show and the caller goes home.
pub fn resolve_active_state(user: &UserContext, selected: Option<&str>) -> Option<String> {
    if user.role.is_state_level() {
        return user.state.clone();
    }
    selected
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
}
