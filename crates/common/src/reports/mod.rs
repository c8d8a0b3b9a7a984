//! Report domain model
//!
//! A report is one program's compliance document for a state, identified by
//! `(reportType, state, id)`. Its answers live in `field_data`, a JSON object
//! whose entity arrays (sanctions, quality measures, ...) are edited through
//! the entity operations in [`crate::entities`].

mod service;

pub use service::{EntityView, ReportService};

use crate::errors::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Days after the reporting period ends that a report is due
pub const DUE_DATE_OFFSET_DAYS: i64 = 180;

/// Page fields mirrored into the report's own metadata
pub const PROGRAM_NAME_FIELD: &str = "programName";
pub const PERIOD_START_FIELD: &str = "reportingPeriodStartDate";
pub const PERIOD_END_FIELD: &str = "reportingPeriodEndDate";

/// US states, DC, and territories a report can belong to
pub const STATE_CODES: &[&str] = &[
    "AL", "AK", "AS", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "GU", "HI", "ID",
    "IL", "IN", "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE",
    "NV", "NH", "NJ", "NM", "NY", "NC", "ND", "MP", "OH", "OK", "OR", "PA", "PR", "RI", "SC",
    "SD", "TN", "TX", "UT", "VT", "VI", "VA", "WA", "WV", "WI", "WY",
];

/// Validate and normalize a state code
pub fn parse_state(raw: &str) -> Result<String> {
    let state = raw.trim().to_ascii_uppercase();
    if STATE_CODES.contains(&state.as_str()) {
        Ok(state)
    } else {
        Err(AppError::InvalidFormat {
            message: format!("unknown state code {}", raw),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportType {
    #[serde(rename = "MCPAR")]
    Mcpar,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Mcpar => "MCPAR",
        }
    }

    /// Dashboard path for this report type
    pub fn base_path(&self) -> &'static str {
        match self {
            ReportType::Mcpar => "/mcpar",
        }
    }
}

impl FromStr for ReportType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MCPAR" => Ok(ReportType::Mcpar),
            _ => Err(AppError::InvalidFormat {
                message: format!("unknown report type {}", s),
            }),
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    #[serde(rename = "Not started")]
    NotStarted,
    #[serde(rename = "In progress")]
    InProgress,
    #[serde(rename = "Submitted")]
    Submitted,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::NotStarted => "Not started",
            ReportStatus::InProgress => "In progress",
            ReportStatus::Submitted => "Submitted",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Not started" => Ok(ReportStatus::NotStarted),
            "In progress" => Ok(ReportStatus::InProgress),
            "Submitted" => Ok(ReportStatus::Submitted),
            other => Err(AppError::InvalidFormat {
                message: format!("unknown report status {}", other),
            }),
        }
    }
}

/// Report identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportKey {
    pub report_type: ReportType,
    pub state: String,
    pub id: String,
}

impl ReportKey {
    pub fn new(report_type: ReportType, state: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            report_type,
            state: state.into(),
            id: id.into(),
        }
    }

    /// Error for a key with no stored record
    pub fn not_found(&self) -> AppError {
        AppError::NoMatchingRecord {
            report_type: self.report_type.to_string(),
            state: self.state.clone(),
            id: self.id.clone(),
        }
    }
}

impl fmt::Display for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.report_type, self.state, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub report_type: ReportType,
    pub state: String,
    pub id: String,
    pub program_name: String,
    pub status: ReportStatus,
    pub due_date: String,
    pub reporting_period_start_date: String,
    pub reporting_period_end_date: String,
    pub combined_data: bool,
    pub submitted_by: Option<String>,
    pub submitted_on: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_altered: DateTime<Utc>,
    pub last_altered_by: String,
    pub archived: bool,
    pub form_template_id: String,
    pub field_data: Map<String, Value>,
}

/// List view of a report (no field data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub report_type: ReportType,
    pub state: String,
    pub id: String,
    pub program_name: String,
    pub status: ReportStatus,
    pub due_date: String,
    pub reporting_period_start_date: String,
    pub reporting_period_end_date: String,
    pub combined_data: bool,
    pub submitted_by: Option<String>,
    pub submitted_on: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_altered: DateTime<Utc>,
    pub last_altered_by: String,
    pub archived: bool,
}

impl Report {
    pub fn key(&self) -> ReportKey {
        ReportKey::new(self.report_type, self.state.clone(), self.id.clone())
    }

    pub fn metadata(&self) -> ReportMetadata {
        ReportMetadata {
            report_type: self.report_type,
            state: self.state.clone(),
            id: self.id.clone(),
            program_name: self.program_name.clone(),
            status: self.status,
            due_date: self.due_date.clone(),
            reporting_period_start_date: self.reporting_period_start_date.clone(),
            reporting_period_end_date: self.reporting_period_end_date.clone(),
            combined_data: self.combined_data,
            submitted_by: self.submitted_by.clone(),
            submitted_on: self.submitted_on,
            created_at: self.created_at,
            last_altered: self.last_altered,
            last_altered_by: self.last_altered_by.clone(),
            archived: self.archived,
        }
    }

    /// Reject writes once archived
    pub fn ensure_writable(&self) -> Result<()> {
        if self.archived {
            Err(AppError::ReportArchived {
                id: self.id.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Merge a field patch; `null` values remove the key
    ///
    /// Program name and reporting period edits also update the metadata the
    /// dashboard lists, including the due date.
    pub fn merge_field_data(&mut self, patch: Map<String, Value>) {
        for (name, value) in patch {
            if value.is_null() {
                self.field_data.remove(&name);
                continue;
            }
            if let Some(text) = value.as_str().map(str::trim).filter(|t| !t.is_empty()) {
                match name.as_str() {
                    PROGRAM_NAME_FIELD => self.program_name = text.to_string(),
                    PERIOD_START_FIELD => self.reporting_period_start_date = text.to_string(),
                    PERIOD_END_FIELD => {
                        if let Some(due_date) = due_date_for(text) {
                            self.due_date = due_date;
                        }
                        self.reporting_period_end_date = text.to_string();
                    }
                    _ => {}
                }
            }
            self.field_data.insert(name, value);
        }
    }

    /// Stamp an edit by `user_name`; any edit puts the report in progress
    pub fn touch(&mut self, user_name: &str) {
        self.last_altered = Utc::now();
        self.last_altered_by = user_name.to_string();
        self.status = ReportStatus::InProgress;
    }
}

/// Due date for a reporting period ending on `end_date` (MM/DD/YYYY)
pub fn due_date_for(end_date: &str) -> Option<String> {
    crate::forms::parse_date(end_date)
        .map(|end| (end + Duration::days(DUE_DATE_OFFSET_DAYS)).format("%m/%d/%Y").to_string())
}

/// Start a report (add a program)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReport {
    #[validate(length(min = 1, max = 256))]
    pub program_name: String,

    pub reporting_period_start_date: String,

    pub reporting_period_end_date: String,

    #[serde(default)]
    pub combined_data: bool,

    #[serde(default)]
    pub field_data: Map<String, Value>,
}

/// Edit program metadata and/or save a page of fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReport {
    #[validate(length(min = 1, max = 256))]
    pub program_name: Option<String>,

    pub reporting_period_start_date: Option<String>,

    pub reporting_period_end_date: Option<String>,

    pub combined_data: Option<bool>,

    #[serde(default)]
    pub field_data: Map<String, Value>,
}

impl UpdateReport {
    pub fn has_metadata(&self) -> bool {
        self.program_name.is_some()
            || self.reporting_period_start_date.is_some()
            || self.reporting_period_end_date.is_some()
            || self.combined_data.is_some()
    }
}

/// Program metadata in the shape of the add/edit program form
pub fn program_fields(
    program_name: &str,
    start_date: &str,
    end_date: &str,
    combined_data: bool,
) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("aep-programName".into(), Value::String(program_name.to_string()));
    fields.insert("aep-startDate".into(), Value::String(start_date.to_string()));
    fields.insert("aep-endDate".into(), Value::String(end_date.to_string()));
    fields.insert("aep-combinedData".into(), Value::Bool(combined_data));
    fields
}
