//! API handlers module

pub mod dashboard;
pub mod entities;
pub mod forms;
pub mod health;
pub mod navigation;
pub mod reports;

use mcr_common::errors::{AppError, Result};
use mcr_common::reports::{parse_state, ReportKey, ReportType};

/// Parse the `{report_type}/{state}/{id}` path segments
pub(crate) fn report_key(report_type: &str, state: &str, id: &str) -> Result<ReportKey> {
    Ok(ReportKey::new(report_type.parse()?, parse_state(state)?, id))
}

/// Like [`report_key`], but segments naming no known report type or state
/// identify no record rather than a malformed request
pub(crate) fn existing_report_key(report_type: &str, state: &str, id: &str) -> Result<ReportKey> {
    report_key(report_type, state, id).map_err(|_| AppError::NoMatchingRecord {
        report_type: report_type.to_string(),
        state: state.to_string(),
        id: id.to_string(),
    })
}

pub(crate) fn report_scope(report_type: &str, state: &str) -> Result<(ReportType, String)> {
    Ok((report_type.parse()?, parse_state(state)?))
}
