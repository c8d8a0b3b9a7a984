//! Static registry of report templates and compiled form schemas

use super::rules::Rule;
use super::schema::{FieldSchema, FormSchema};
use super::template::{FieldType, ReportTemplate};
use crate::errors::{AppError, Result};
use std::collections::HashMap;

const MCPAR_TEMPLATE: &str = include_str!("../../templates/mcpar.json");

/// Form id of the add/edit program modal
pub const ADD_EDIT_PROGRAM: &str = "addEditProgram";

/// Schemas and templates known to the service, compiled once at startup
#[derive(Debug, Clone)]
pub struct FormRegistry {
    templates: HashMap<String, ReportTemplate>,
    schemas: HashMap<String, FormSchema>,
}

impl FormRegistry {
    /// Registry with every built-in template and standalone form
    pub fn builtin() -> Result<Self> {
        let mut registry = Self {
            templates: HashMap::new(),
            schemas: HashMap::new(),
        };

        registry.register_schema(add_edit_program_schema());
        registry.register_schema(test_schema());
        registry.register_template(ReportTemplate::from_json(MCPAR_TEMPLATE)?)?;

        tracing::info!(
            templates = registry.templates.len(),
            schemas = registry.schemas.len(),
            "Form registry loaded"
        );
        Ok(registry)
    }

    pub fn register_schema(&mut self, schema: FormSchema) {
        self.schemas.insert(schema.id.clone(), schema);
    }

    /// Compile and register every form of a template
    pub fn register_template(&mut self, template: ReportTemplate) -> Result<()> {
        for form in template.forms() {
            if self.schemas.contains_key(&form.id) {
                return Err(AppError::Configuration {
                    message: format!("duplicate form id {} in template {}", form.id, template.id),
                });
            }
            let schema = form.compile()?;
            self.schemas.insert(schema.id.clone(), schema);
        }
        self.templates.insert(template.report_type.clone(), template);
        Ok(())
    }

    pub fn schema(&self, form_id: &str) -> Option<&FormSchema> {
        self.schemas.get(form_id)
    }

    pub fn require_schema(&self, form_id: &str) -> Result<&FormSchema> {
        self.schema(form_id).ok_or_else(|| AppError::InvalidFormat {
            message: format!("unknown form {}", form_id),
        })
    }

    pub fn template(&self, report_type: &str) -> Option<&ReportTemplate> {
        self.templates.get(report_type)
    }

    pub fn require_template(&self, report_type: &str) -> Result<&ReportTemplate> {
        self.template(report_type).ok_or_else(|| AppError::InvalidFormat {
            message: format!("no template for report type {}", report_type),
        })
    }

    pub fn templates(&self) -> impl Iterator<Item = &ReportTemplate> {
        self.templates.values()
    }

    /// All top-level page fields of a report, for whole-report validation
    pub fn report_schema(&self, report_type: &str) -> Result<FormSchema> {
        let template = self.require_template(report_type)?;
        let schemas = template
            .page_forms()
            .into_iter()
            .filter_map(|form| self.schemas.get(&form.id).cloned());
        Ok(FormSchema::merged(template.id.clone(), schemas))
    }

    /// Page schema that owns a top-level report field
    pub fn page_schema_for_field(&self, report_type: &str, field: &str) -> Option<&FormSchema> {
        self.template(report_type)?
            .page_forms()
            .into_iter()
            .filter_map(|form| self.schemas.get(&form.id))
            .find(|schema| schema.contains(field))
    }

    /// Whether blur may write a top-level field straight to the report
    ///
    /// Only fields the template flags for autosave qualify; repeating
    /// (`dynamic`) fields hold entity rows and never do.
    pub fn is_autosave_field(&self, report_type: &str, field: &str) -> bool {
        let Some(template) = self.template(report_type) else {
            return false;
        };
        template
            .page_forms()
            .into_iter()
            .find_map(|form| form.find_field(field))
            .map(|f| f.autosave && f.field_type != FieldType::Dynamic)
            .unwrap_or(false)
    }

    /// Schema used to add/edit entities of a type
    pub fn entity_schema(&self, report_type: &str, entity_type: &str) -> Option<&FormSchema> {
        let form = self.template(report_type)?.entity_form(entity_type)?;
        self.schemas.get(&form.id)
    }
}

/// Program metadata captured when a report is started or edited
fn add_edit_program_schema() -> FormSchema {
    FormSchema::new(
        ADD_EDIT_PROGRAM,
        vec![
            FieldSchema::required("aep-programName", Rule::Text),
            FieldSchema::required("aep-startDate", Rule::Date),
            FieldSchema::required(
                "aep-endDate",
                Rule::EndDate {
                    start_field: "aep-startDate".to_string(),
                },
            ),
            FieldSchema::optional("aep-combinedData", Rule::ChoiceSingle),
        ],
    )
}

/// Exercise form covering nested conditional choices and numeric inputs
fn test_schema() -> FormSchema {
    let mut fields = vec![
        FieldSchema::required("test1", Rule::Choice),
        FieldSchema::when("test1-o1-c", Rule::Choice, "test1", "option1"),
        FieldSchema::when("test1-o1-c-o1-c", Rule::Text, "test1-o1-c", "option1-1"),
        FieldSchema::required("test2", Rule::Choice),
        FieldSchema::when("test2-o1-c", Rule::Choice, "test2", "option1"),
        FieldSchema::when("test2-o1-c-o1-c", Rule::Text, "test2-o1-c", "option1-1"),
    ];
    fields.extend((3..=10).map(|n| FieldSchema::required(format!("test{}", n), Rule::Number)));
    FormSchema::new("test", fields)
}
