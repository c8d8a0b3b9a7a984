//! Template and form validation handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::AppState;
use mcr_common::{
    errors::{AppError, Result},
    forms::ReportTemplate,
    metrics,
    reports::ReportType,
    UserContext,
};

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    /// Validate only this field (blur); the whole form otherwise (submit)
    pub field: Option<String>,
}

#[derive(Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
}

pub async fn get_template(
    State(state): State<AppState>,
    _user: UserContext,
    Path(report_type): Path<String>,
) -> Result<Json<ReportTemplate>> {
    let report_type: ReportType = report_type.parse()?;
    let template = state.reports.forms().require_template(report_type.as_str())?;
    Ok(Json(template.clone()))
}

/// Validate form data; failures come back as a 400 with per-field messages
pub async fn validate_form(
    State(state): State<AppState>,
    _user: UserContext,
    Path(form_id): Path<String>,
    Query(query): Query<ValidateQuery>,
    Json(data): Json<Map<String, Value>>,
) -> Result<Json<ValidationResponse>> {
    let schema = state.reports.forms().require_schema(&form_id)?;

    let outcome = match query.field.as_deref() {
        Some(field) => schema.validate_field(field, &data),
        None => schema.validate(&data).map_err(AppError::from),
    };
    if outcome.is_err() {
        metrics::record_validation_failure(&form_id);
    }
    outcome?;

    Ok(Json(ValidationResponse { valid: true }))
}
