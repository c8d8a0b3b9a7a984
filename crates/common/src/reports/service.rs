//! Report operations with authorization
//!
//! Every operation takes the caller's [`UserContext`]. Reads are scoped by
//! [`UserContext::can_read_state`], writes by [`UserContext::can_write_state`],
//! and archiving is admin-only. Writes go through [`ReportStore::update`], so
//! the archived check and any validation that reads sibling fields run under
//! the store's per-report lock.

use super::{
    due_date_for, program_fields, CreateReport, Report, ReportKey, ReportMetadata, ReportStatus,
    ReportType, UpdateReport, PERIOD_END_FIELD, PERIOD_START_FIELD, PROGRAM_NAME_FIELD,
};
use crate::auth::UserContext;
use crate::autosave::{plan_autosave, AutosaveOutcome, AutosaveRequest};
use crate::db::ReportStore;
use crate::entities::{self, EntityShape, EntityType};
use crate::errors::{AppError, FieldErrors, Result};
use crate::forms::{FieldSchema, FormRegistry, FormSchema, Requirement, Rule, ADD_EDIT_PROGRAM};
use crate::metrics;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// An entity with its formatted view model
#[derive(Debug, Clone, Serialize)]
pub struct EntityView {
    pub id: String,
    pub data: EntityShape,
    pub formatted: Map<String, Value>,
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn ReportStore>,
    forms: Arc<FormRegistry>,
}

impl ReportService {
    pub fn new(store: Arc<dyn ReportStore>, forms: Arc<FormRegistry>) -> Self {
        Self { store, forms }
    }

    pub fn forms(&self) -> &FormRegistry {
        &self.forms
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    fn validate_form(&self, form_id: &str, data: &Map<String, Value>) -> Result<()> {
        self.forms.require_schema(form_id)?.validate(data).map_err(|errors| {
            metrics::record_validation_failure(form_id);
            errors.into()
        })
    }

    pub async fn fetch_report(&self, user: &UserContext, key: &ReportKey) -> Result<Report> {
        user.require_read(&key.state)?;
        self.store.get(key).await?.ok_or_else(|| key.not_found())
    }

    pub async fn fetch_reports_by_state(
        &self,
        user: &UserContext,
        report_type: ReportType,
        state: &str,
    ) -> Result<Vec<ReportMetadata>> {
        user.require_read(state)?;
        self.store.list_by_state(report_type, state).await
    }

    /// Start a report for a program
    pub async fn create_report(
        &self,
        user: &UserContext,
        report_type: ReportType,
        state: &str,
        request: CreateReport,
    ) -> Result<Report> {
        user.require_write(state)?;
        request.validate()?;

        let program = program_fields(
            &request.program_name,
            &request.reporting_period_start_date,
            &request.reporting_period_end_date,
            request.combined_data,
        );
        self.validate_form(ADD_EDIT_PROGRAM, &program)?;

        let template = self.forms.require_template(report_type.as_str())?;
        let due_date = due_date_for(&request.reporting_period_end_date).ok_or_else(|| {
            AppError::InvalidFormat {
                message: "reporting period end date is not a valid date".to_string(),
            }
        })?;

        let mut field_data = Map::new();
        check_page_fields(&self.forms, report_type, &request.field_data, &field_data)?;
        field_data.extend(request.field_data);
        field_data.insert(
            PROGRAM_NAME_FIELD.into(),
            Value::String(request.program_name.clone()),
        );
        field_data.insert(
            PERIOD_START_FIELD.into(),
            Value::String(request.reporting_period_start_date.clone()),
        );
        field_data.insert(
            PERIOD_END_FIELD.into(),
            Value::String(request.reporting_period_end_date.clone()),
        );

        let now = Utc::now();
        let report = Report {
            report_type,
            state: state.to_string(),
            id: Uuid::new_v4().to_string(),
            program_name: request.program_name,
            status: ReportStatus::NotStarted,
            due_date,
            reporting_period_start_date: request.reporting_period_start_date,
            reporting_period_end_date: request.reporting_period_end_date,
            combined_data: request.combined_data,
            submitted_by: None,
            submitted_on: None,
            created_at: now,
            last_altered: now,
            last_altered_by: user.full_name.clone(),
            archived: false,
            form_template_id: template.id.clone(),
            field_data,
        };

        self.store.insert(&report).await?;
        metrics::record_report_created(report_type.as_str(), state);
        info!(report_id = %report.id, state = %state, report_type = %report_type, "Report created");
        Ok(report)
    }

    /// Edit program metadata and merge page fields into the report
    pub async fn update_report(
        &self,
        user: &UserContext,
        key: &ReportKey,
        request: UpdateReport,
    ) -> Result<Report> {
        user.require_write(&key.state)?;
        request.validate()?;

        let forms = self.forms.clone();
        let report_type = key.report_type;
        let user_name = user.full_name.clone();

        let report = self
            .store
            .update(
                key,
                Box::new(move |report: &mut Report| {
                    report.ensure_writable()?;

                    if request.has_metadata() {
                        let name = request
                            .program_name
                            .unwrap_or_else(|| report.program_name.clone());
                        let start = request
                            .reporting_period_start_date
                            .unwrap_or_else(|| report.reporting_period_start_date.clone());
                        let end = request
                            .reporting_period_end_date
                            .unwrap_or_else(|| report.reporting_period_end_date.clone());
                        let combined = request.combined_data.unwrap_or(report.combined_data);

                        let program = program_fields(&name, &start, &end, combined);
                        forms
                            .require_schema(ADD_EDIT_PROGRAM)?
                            .validate(&program)
                            .map_err(|errors| {
                                metrics::record_validation_failure(ADD_EDIT_PROGRAM);
                                AppError::from(errors)
                            })?;

                        if let Some(due_date) = due_date_for(&end) {
                            report.due_date = due_date;
                        }
                        report
                            .field_data
                            .insert(PROGRAM_NAME_FIELD.into(), Value::String(name.clone()));
                        report.field_data.insert(
                            PERIOD_START_FIELD.into(),
                            Value::String(start.clone()),
                        );
                        report
                            .field_data
                            .insert(PERIOD_END_FIELD.into(), Value::String(end.clone()));
                        report.program_name = name;
                        report.reporting_period_start_date = start;
                        report.reporting_period_end_date = end;
                        report.combined_data = combined;
                    }

                    check_page_fields(&forms, report_type, &request.field_data, &report.field_data)?;
                    report.merge_field_data(request.field_data);
                    report.touch(&user_name);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| key.not_found())?;

        info!(report_id = %report.id, state = %report.state, "Report updated");
        Ok(report)
    }

    /// Write changed, valid fields; see [`plan_autosave`]
    pub async fn autosave(
        &self,
        user: &UserContext,
        key: &ReportKey,
        request: AutosaveRequest,
    ) -> Result<AutosaveOutcome> {
        user.require_write(&key.state)?;
        let current = self.store.get(key).await?.ok_or_else(|| key.not_found())?;
        current.ensure_writable()?;

        let plan = plan_autosave(
            &self.forms,
            key.report_type.as_str(),
            &request.fields,
            &current.field_data,
        );
        metrics::record_autosave(plan.saved.len(), plan.skipped.len());

        if plan.is_empty() {
            debug!(report_id = %key.id, skipped = plan.skipped.len(), "Nothing to autosave");
            return Ok(AutosaveOutcome {
                saved: plan.saved,
                skipped: plan.skipped,
                last_altered: current.last_altered,
            });
        }

        let user_name = user.full_name.clone();
        let patch = plan.patch;
        let report = self
            .store
            .update(
                key,
                Box::new(move |report: &mut Report| {
                    report.ensure_writable()?;
                    report.merge_field_data(patch);
                    report.touch(&user_name);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| key.not_found())?;

        debug!(report_id = %key.id, saved = plan.saved.len(), "Autosaved fields");
        Ok(AutosaveOutcome {
            saved: plan.saved,
            skipped: plan.skipped,
            last_altered: report.last_altered,
        })
    }

    /// Mark a report archived; admin only
    ///
    /// Permission is checked before existence, so non-admins learn nothing
    /// about which reports exist.
    pub async fn archive_report(&self, user: &UserContext, key: &ReportKey) -> Result<Report> {
        user.require_admin()?;

        let report = self
            .store
            .update(
                key,
                Box::new(|report: &mut Report| {
                    report.archived = true;
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| key.not_found())?;

        metrics::record_report_archived(key.report_type.as_str());
        info!(report_id = %report.id, state = %report.state, user = %user.email, "Report archived");
        Ok(report)
    }

    /// Validate every page of the report, then mark it submitted
    pub async fn submit_report(&self, user: &UserContext, key: &ReportKey) -> Result<Report> {
        user.require_write(&key.state)?;

        let schema = self.forms.report_schema(key.report_type.as_str())?;
        let user_name = user.full_name.clone();

        let report = self
            .store
            .update(
                key,
                Box::new(move |report: &mut Report| {
                    report.ensure_writable()?;
                    schema.validate(&report.field_data).map_err(|errors| {
                        metrics::record_validation_failure(&schema.id);
                        AppError::from(errors)
                    })?;

                    let now = Utc::now();
                    report.status = ReportStatus::Submitted;
                    report.submitted_by = Some(user_name.clone());
                    report.submitted_on = Some(now);
                    report.last_altered = now;
                    report.last_altered_by = user_name;
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| key.not_found())?;

        metrics::record_report_submitted(key.report_type.as_str());
        info!(report_id = %report.id, state = %report.state, "Report submitted");
        Ok(report)
    }

    /// Entities of a type with their view models, in insertion order
    pub async fn list_entities(
        &self,
        user: &UserContext,
        key: &ReportKey,
        entity_type: EntityType,
    ) -> Result<Vec<EntityView>> {
        let report = self.fetch_report(user, key).await?;
        let views = entities::list_entities(&report.field_data, entity_type)
            .into_iter()
            .map(|entity| EntityView {
                id: entity
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                formatted: entities::format_entity(
                    entity_type.as_str(),
                    Some(entity),
                    Some(&report.field_data),
                ),
                data: entity.clone(),
            })
            .collect();
        Ok(views)
    }

    /// Schema entity payloads of a type must satisfy
    fn entity_schema(&self, report_type: ReportType, entity_type: EntityType) -> Result<FormSchema> {
        if entity_type == EntityType::Plans {
            // plans are added by name; drawer fields are checked once filled in
            let mut fields = vec![FieldSchema::required("name", Rule::Text)];
            if let Some(drawer) = self.forms.entity_schema(report_type.as_str(), entity_type.as_str()) {
                fields.extend(drawer.fields.iter().map(|field| FieldSchema {
                    requirement: Requirement::Optional,
                    ..field.clone()
                }));
            }
            return Ok(FormSchema::new("plans", fields));
        }
        self.forms
            .entity_schema(report_type.as_str(), entity_type.as_str())
            .cloned()
            .ok_or_else(|| AppError::InvalidFormat {
                message: format!("no form for entity type {}", entity_type),
            })
    }

    pub async fn add_entity(
        &self,
        user: &UserContext,
        key: &ReportKey,
        entity_type: EntityType,
        entity: EntityShape,
    ) -> Result<(String, Report)> {
        user.require_write(&key.state)?;
        let schema = self.entity_schema(key.report_type, entity_type)?;
        schema.validate(&entity).map_err(|errors| {
            metrics::record_validation_failure(&schema.id);
            AppError::from(errors)
        })?;

        let id = entities::new_entity_id();
        let entity_id = id.clone();
        let user_name = user.full_name.clone();
        let report = self
            .store
            .update(
                key,
                Box::new(move |report: &mut Report| {
                    report.ensure_writable()?;
                    entities::insert_entity(&mut report.field_data, entity_type, &entity_id, entity);
                    report.touch(&user_name);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| key.not_found())?;

        info!(report_id = %key.id, entity_type = %entity_type, entity_id = %id, "Entity added");
        Ok((id, report))
    }

    /// Merge fields into an entity; the merged entity must satisfy its form
    pub async fn update_entity(
        &self,
        user: &UserContext,
        key: &ReportKey,
        entity_type: EntityType,
        id: &str,
        entity: EntityShape,
    ) -> Result<Report> {
        user.require_write(&key.state)?;
        let schema = self.entity_schema(key.report_type, entity_type)?;
        let entity_id = id.to_string();
        let user_name = user.full_name.clone();

        let report = self
            .store
            .update(
                key,
                Box::new(move |report: &mut Report| {
                    report.ensure_writable()?;
                    let mut merged = entities::find_entity(&report.field_data, entity_type, &entity_id)
                        .cloned()
                        .ok_or_else(|| AppError::EntityNotFound {
                            entity_type: entity_type.to_string(),
                            id: entity_id.clone(),
                        })?;
                    merged.extend(entity.clone());
                    schema.validate(&merged).map_err(|errors| {
                        metrics::record_validation_failure(&schema.id);
                        AppError::from(errors)
                    })?;

                    entities::update_entity(&mut report.field_data, entity_type, &entity_id, entity)?;
                    report.touch(&user_name);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| key.not_found())?;

        info!(report_id = %key.id, entity_type = %entity_type, entity_id = %id, "Entity updated");
        Ok(report)
    }

    pub async fn delete_entity(
        &self,
        user: &UserContext,
        key: &ReportKey,
        entity_type: EntityType,
        id: &str,
    ) -> Result<Report> {
        user.require_write(&key.state)?;
        let entity_id = id.to_string();
        let user_name = user.full_name.clone();

        let report = self
            .store
            .update(
                key,
                Box::new(move |report: &mut Report| {
                    report.ensure_writable()?;
                    entities::delete_entity(&mut report.field_data, entity_type, &entity_id)?;
                    report.touch(&user_name);
                    Ok(())
                }),
            )
            .await?
            .ok_or_else(|| key.not_found())?;

        info!(report_id = %key.id, entity_type = %entity_type, entity_id = %id, "Entity deleted");
        Ok(report)
    }
}

/// Validate top-level fields written through page saves
///
/// Each field must belong to a page form of the report's template and pass
/// its rule against the merged view of `current` and `patch`. Entity arrays
/// other than plans are edited through the entity operations only.
fn check_page_fields(
    forms: &FormRegistry,
    report_type: ReportType,
    patch: &Map<String, Value>,
    current: &Map<String, Value>,
) -> Result<()> {
    if patch.is_empty() {
        return Ok(());
    }

    let mut view = current.clone();
    view.extend(patch.clone());

    let mut failures = FieldErrors::new();
    for name in patch.keys() {
        let Some(schema) = forms.page_schema_for_field(report_type.as_str(), name) else {
            let message = if name.parse::<EntityType>().is_ok() {
                format!("{} is edited through the entity endpoints", name)
            } else {
                format!("no schema for field {}", name)
            };
            return Err(AppError::InvalidFormat { message });
        };

        if let Err(AppError::Validation { fields, .. }) = schema.validate_field(name, &view) {
            failures.extend(fields);
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        metrics::record_validation_failure(report_type.as_str());
        Err(AppError::Validation {
            message: format!("{} field(s) failed validation", failures.len()),
            fields: failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;
    use crate::db::MemoryStore;
    use serde_json::json;

    fn user(role: UserRole, state: Option<&str>) -> UserContext {
        UserContext {
            user_id: format!("{:?}", role),
            email: "user@example.com".to_string(),
            full_name: "Test User".to_string(),
            state: state.map(str::to_string),
            role,
        }
    }

    fn state_user() -> UserContext {
        user(UserRole::StateUser, Some("MD"))
    }

    fn admin() -> UserContext {
        user(UserRole::Admin, None)
    }

    fn service() -> ReportService {
        ReportService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FormRegistry::builtin().unwrap()),
        )
    }

    fn create_request() -> CreateReport {
        CreateReport {
            program_name: "Program A".to_string(),
            reporting_period_start_date: "01/01/2022".to_string(),
            reporting_period_end_date: "12/31/2022".to_string(),
            combined_data: false,
            field_data: Map::new(),
        }
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn created(service: &ReportService) -> Report {
        service
            .create_report(&state_user(), ReportType::Mcpar, "MD", create_request())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_report_seeds_field_data() {
        let service = service();
        let report = created(&service).await;

        assert_eq!(report.status, ReportStatus::NotStarted);
        assert_eq!(report.due_date, "06/29/2023");
        assert_eq!(report.form_template_id, "mcpar-template-v1");
        assert_eq!(report.field_data["programName"], json!("Program A"));
        assert_eq!(report.last_altered_by, "Test User");
    }

    #[tokio::test]
    async fn test_create_report_rejects_bad_dates() {
        let service = service();
        let mut request = create_request();
        request.reporting_period_end_date = "12/31/2021".to_string();

        let err = service
            .create_report(&state_user(), ReportType::Mcpar, "MD", request)
            .await
            .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);
    }

    #[tokio::test]
    async fn test_create_report_requires_state_user_of_state() {
        let service = service();
        for caller in [admin(), user(UserRole::StateUser, Some("VA"))] {
            let err = service
                .create_report(&caller, ReportType::Mcpar, "MD", create_request())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized));
        }
    }

    #[tokio::test]
    async fn test_read_scoping() {
        let service = service();
        let report = created(&service).await;

        assert!(service.fetch_report(&admin(), &report.key()).await.is_ok());
        assert!(service
            .fetch_report(&user(UserRole::HelpDesk, None), &report.key())
            .await
            .is_ok());
        let err = service
            .fetch_report(&user(UserRole::StateRep, Some("VA")), &report.key())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn test_archive_contract() {
        let service = service();
        let report = created(&service).await;
        let missing = ReportKey::new(ReportType::Mcpar, "MD", "missing");

        let err = service.archive_report(&state_user(), &missing).await.unwrap_err();
        assert_eq!(err.status_code().as_u16(), 403);
        let err = service.archive_report(&state_user(), &report.key()).await.unwrap_err();
        assert_eq!(err.status_code().as_u16(), 403);

        let err = service.archive_report(&admin(), &missing).await.unwrap_err();
        assert_eq!(err.status_code().as_u16(), 404);

        let archived = service.archive_report(&admin(), &report.key()).await.unwrap();
        assert!(archived.archived);
        assert_eq!(archived.program_name, report.program_name);

        // archiving again keeps it archived
        let again = service.archive_report(&admin(), &report.key()).await.unwrap();
        assert!(again.archived);
    }

    #[tokio::test]
    async fn test_archived_report_rejects_writes() {
        let service = service();
        let report = created(&service).await;
        service.archive_report(&admin(), &report.key()).await.unwrap();

        let update = UpdateReport {
            field_data: obj(json!({"contactName": "Ada"})),
            ..Default::default()
        };
        let err = service
            .update_report(&state_user(), &report.key(), update)
            .await
            .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 409);
    }

    #[tokio::test]
    async fn test_update_merges_fields_and_metadata() {
        let service = service();
        let report = created(&service).await;

        let update = UpdateReport {
            program_name: Some("Program B".to_string()),
            field_data: obj(json!({"contactName": "Ada"})),
            ..Default::default()
        };
        let updated = service
            .update_report(&state_user(), &report.key(), update)
            .await
            .unwrap();

        assert_eq!(updated.program_name, "Program B");
        assert_eq!(updated.field_data["programName"], json!("Program B"));
        assert_eq!(updated.field_data["contactName"], json!("Ada"));
        assert_eq!(updated.field_data["reportingPeriodEndDate"], json!("12/31/2022"));
        assert_eq!(updated.status, ReportStatus::InProgress);
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_and_entity_fields() {
        let service = service();
        let report = created(&service).await;

        for field_data in [json!({"nope": "x"}), json!({"sanctions": []})] {
            let update = UpdateReport {
                field_data: obj(field_data),
                ..Default::default()
            };
            let err = service
                .update_report(&state_user(), &report.key(), update)
                .await
                .unwrap_err();
            assert_eq!(err.status_code().as_u16(), 400);
        }
    }

    #[tokio::test]
    async fn test_autosave_writes_changed_fields() {
        let service = service();
        let report = created(&service).await;

        let request: AutosaveRequest = serde_json::from_value(json!({
            "fields": [
                {"name": "contactName", "value": "Ada", "hydrationValue": ""},
                {"name": "contactEmailAddress", "value": "bad", "hydrationValue": ""},
                {"name": "programName", "value": "Program A"}
            ]
        }))
        .unwrap();

        let outcome = service
            .autosave(&state_user(), &report.key(), request)
            .await
            .unwrap();
        assert_eq!(outcome.saved, vec!["contactName".to_string()]);
        assert_eq!(outcome.skipped.len(), 1);

        let stored = service.fetch_report(&admin(), &report.key()).await.unwrap();
        assert_eq!(stored.field_data["contactName"], json!("Ada"));
        assert!(stored.field_data.get("contactEmailAddress").is_none());
        assert_eq!(stored.status, ReportStatus::InProgress);
    }

    #[tokio::test]
    async fn test_autosaved_program_fields_update_listing() {
        let service = service();
        let report = created(&service).await;

        let request: AutosaveRequest = serde_json::from_value(json!({
            "fields": [
                {"name": "programName", "value": "Renamed", "hydrationValue": "Program A"},
                {"name": "reportingPeriodEndDate", "value": "06/30/2023", "hydrationValue": "12/31/2022"}
            ]
        }))
        .unwrap();
        let outcome = service
            .autosave(&state_user(), &report.key(), request)
            .await
            .unwrap();
        assert_eq!(outcome.saved.len(), 2);

        let stored = service.fetch_report(&state_user(), &report.key()).await.unwrap();
        assert_eq!(stored.program_name, "Renamed");
        assert_eq!(stored.reporting_period_end_date, "06/30/2023");
        assert_eq!(stored.due_date, "12/27/2023");

        let listed = service
            .fetch_reports_by_state(&state_user(), ReportType::Mcpar, "MD")
            .await
            .unwrap();
        assert_eq!(listed[0].program_name, "Renamed");
        assert_eq!(listed[0].due_date, "12/27/2023");
    }

    #[tokio::test]
    async fn test_submit_requires_complete_report() {
        let service = service();
        let report = created(&service).await;

        let err = service.submit_report(&state_user(), &report.key()).await.unwrap_err();
        match err {
            AppError::Validation { fields, .. } => assert!(fields.contains_key("contactName")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_entity_lifecycle() {
        let service = service();
        let report = created(&service).await;
        let key = report.key();

        let measure = obj(json!({
            "qualityMeasure_name": "Well-child visits",
            "qualityMeasure_description": "Annual visit rate",
            "qualityMeasure_domain": [{"key": "qualityMeasure_domain-primaryCare", "value": "Primary care"}],
            "qualityMeasure_nqfNumber": "1392",
            "qualityMeasure_reportingPeriod": [{"key": "qualityMeasure_reportingPeriod-yes", "value": "Yes"}],
            "qualityMeasure_reportingRateType": [{"key": "qualityMeasure_reportingRateType-programSpecific", "value": "Program-specific rate"}],
            "qualityMeasure_set": [{"key": "qualityMeasure_set-other", "value": "Other, specify"}],
            "qualityMeasure_set-otherText": "State set"
        }));

        let (id, _) = service
            .add_entity(&state_user(), &key, EntityType::QualityMeasures, measure)
            .await
            .unwrap();

        let views = service
            .list_entities(&admin(), &key, EntityType::QualityMeasures)
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, id);
        assert_eq!(views[0].formatted["set"], json!("State set"));

        service
            .update_entity(
                &state_user(),
                &key,
                EntityType::QualityMeasures,
                &id,
                obj(json!({"qualityMeasure_nqfNumber": "0024"})),
            )
            .await
            .unwrap();

        let err = service
            .update_entity(
                &state_user(),
                &key,
                EntityType::QualityMeasures,
                &id,
                obj(json!({"qualityMeasure_name": ""})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);

        let updated = service
            .delete_entity(&state_user(), &key, EntityType::QualityMeasures, &id)
            .await
            .unwrap();
        assert!(entities::list_entities(&updated.field_data, EntityType::QualityMeasures).is_empty());
    }

    #[tokio::test]
    async fn test_add_entity_validates_payload() {
        let service = service();
        let report = created(&service).await;

        let err = service
            .add_entity(
                &state_user(),
                &report.key(),
                EntityType::Sanctions,
                obj(json!({"sanction_interventionReason": "Late"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);

        let (_, updated) = service
            .add_entity(
                &state_user(),
                &report.key(),
                EntityType::Plans,
                obj(json!({"name": "Plan A"})),
            )
            .await
            .unwrap();
        assert_eq!(updated.field_data["plans"][0]["name"], json!("Plan A"));
    }

    #[tokio::test]
    async fn test_plan_drawer_fields_are_validated() {
        let service = service();
        let report = created(&service).await;

        let err = service
            .add_entity(
                &state_user(),
                &report.key(),
                EntityType::Plans,
                obj(json!({"name": "Plan A", "plan_enrollment": "lots"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);

        let (plan_id, _) = service
            .add_entity(
                &state_user(),
                &report.key(),
                EntityType::Plans,
                obj(json!({"name": "Plan A"})),
            )
            .await
            .unwrap();

        let err = service
            .update_entity(
                &state_user(),
                &report.key(),
                EntityType::Plans,
                &plan_id,
                obj(json!({"plan_enrollment": "not a number"})),
            )
            .await
            .unwrap_err();
        match err {
            AppError::Validation { fields, .. } => assert!(fields.contains_key("plan_enrollment")),
            other => panic!("unexpected error {:?}", other),
        }

        let updated = service
            .update_entity(
                &state_user(),
                &report.key(),
                EntityType::Plans,
                &plan_id,
                obj(json!({"plan_enrollment": "1,000", "plan_medicaidEnrollmentShare": "12.5"})),
            )
            .await
            .unwrap();
        assert_eq!(updated.field_data["plans"][0]["plan_enrollment"], json!("1,000"));
        assert_eq!(updated.field_data["plans"][0]["name"], json!("Plan A"));
    }
}
