//! Declarative form and report-template definitions
//!
//! A [`ReportTemplate`] is the tree of pages a report is made of. Each page
//! carries a [`FormJson`]: the UI-facing field list, with nested fields under
//! choices. [`FormJson::compile`] turns that tree into a flat
//! [`FormSchema`], where every nested field becomes conditionally required on
//! its parent choice being selected.

use super::rules::{Requirement, Rule};
use super::schema::{FieldSchema, FormSchema};
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};

/// UI field kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    Email,
    Url,
    Checkbox,
    Radio,
    Dropdown,
    Dynamic,
    SectionHeader,
}

/// Validation declared on a field, by name or with a dependent field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationJson {
    Named(String),
    Dependent {
        #[serde(rename = "type")]
        kind: String,
        #[serde(rename = "dependentField")]
        dependent_field: String,
    },
}

impl ValidationJson {
    /// Resolve into a rule plus whether the field is optional
    pub fn resolve(&self) -> Result<(Rule, bool)> {
        let (kind, dependent) = match self {
            ValidationJson::Named(kind) => (kind.as_str(), None),
            ValidationJson::Dependent {
                kind,
                dependent_field,
            } => (kind.as_str(), Some(dependent_field)),
        };

        let (base, optional) = match kind.strip_suffix("Optional") {
            Some(base) => (base, true),
            None => (kind, false),
        };

        let rule = match base {
            "text" => Rule::Text,
            "number" => Rule::Number,
            "email" => Rule::Email,
            "url" => Rule::Url,
            "date" => Rule::Date,
            "endDate" => Rule::EndDate {
                start_field: dependent
                    .cloned()
                    .ok_or_else(|| AppError::Configuration {
                        message: "endDate validation needs a dependentField".to_string(),
                    })?,
            },
            "radio" | "checkbox" => Rule::Choice,
            // a lone checkbox is always optional
            "checkboxSingle" => return Ok((Rule::ChoiceSingle, true)),
            "dropdown" => Rule::Dropdown,
            "dynamic" => Rule::Dynamic,
            other => {
                return Err(AppError::Configuration {
                    message: format!("unknown validation type {}", other),
                })
            }
        };

        Ok((rule, optional))
    }
}

/// One option of a checkbox/radio field, possibly revealing nested fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FormField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Blur writes this field straight to the report
    #[serde(default)]
    pub autosave: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormJson {
    pub id: String,
    pub fields: Vec<FormField>,
}

impl FormJson {
    /// Flatten the nested field tree into a validation schema
    pub fn compile(&self) -> Result<FormSchema> {
        let mut fields = Vec::new();
        for field in &self.fields {
            compile_field(field, None, &mut fields)?;
        }
        Ok(FormSchema::new(self.id.clone(), fields))
    }

    /// Field definition by id, searching nested choice children
    pub fn find_field(&self, id: &str) -> Option<&FormField> {
        fn walk<'a>(field: &'a FormField, id: &str) -> Option<&'a FormField> {
            if field.id == id {
                return Some(field);
            }
            field
                .choices
                .iter()
                .flat_map(|choice| choice.children.iter())
                .find_map(|child| walk(child, id))
        }
        self.fields.iter().find_map(|field| walk(field, id))
    }

    /// Every field id in the form, nested ones included
    pub fn field_ids(&self) -> Vec<&str> {
        fn walk<'a>(field: &'a FormField, out: &mut Vec<&'a str>) {
            out.push(&field.id);
            for choice in &field.choices {
                for child in &choice.children {
                    walk(child, out);
                }
            }
        }
        let mut out = Vec::new();
        for field in &self.fields {
            walk(field, &mut out);
        }
        out
    }
}

fn compile_field(
    field: &FormField,
    parent: Option<(&str, &str)>,
    out: &mut Vec<FieldSchema>,
) -> Result<()> {
    if let Some(validation) = &field.validation {
        let (rule, optional) = validation.resolve()?;
        let requirement = match (optional, parent) {
            (true, _) => Requirement::Optional,
            (false, Some((parent_field, choice))) => Requirement::When {
                field: parent_field.to_string(),
                includes: choice.to_string(),
            },
            (false, None) => Requirement::Required,
        };
        out.push(FieldSchema {
            name: field.id.clone(),
            rule,
            requirement,
        });
    }

    for choice in &field.choices {
        for child in &choice.children {
            compile_field(child, Some((&field.id, &choice.id)), out)?;
        }
    }
    Ok(())
}

/// How a report page presents its form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageType {
    Standard,
    /// One drawer form per entity of `entity_type`
    Drawer,
    /// Modal to add/edit entities plus a drawer per entity
    ModalDrawer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRoute {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_type: Option<PageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<FormJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawer_form: Option<FormJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal_form: Option<FormJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ReportRoute>,
}

impl ReportRoute {
    /// Forms attached to this page
    pub fn forms(&self) -> impl Iterator<Item = &FormJson> {
        self.form
            .iter()
            .chain(self.drawer_form.iter())
            .chain(self.modal_form.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTemplate {
    pub id: String,
    pub report_type: String,
    pub name: String,
    pub base_path: String,
    pub routes: Vec<ReportRoute>,
}

/// Depth-first list of leaf routes (the navigable pages)
pub fn flatten_routes(routes: &[ReportRoute]) -> Vec<&ReportRoute> {
    let mut out = Vec::new();
    for route in routes {
        if route.children.is_empty() {
            out.push(route);
        } else {
            out.extend(flatten_routes(&route.children));
        }
    }
    out
}

impl ReportTemplate {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| AppError::Configuration {
            message: format!("invalid report template: {}", e),
        })
    }

    pub fn flat_routes(&self) -> Vec<&ReportRoute> {
        flatten_routes(&self.routes)
    }

    /// Where "Enter" on the dashboard lands
    pub fn first_page_path(&self) -> Option<&str> {
        self.flat_routes().first().map(|r| r.path.as_str())
    }

    /// Every form on every page
    pub fn forms(&self) -> Vec<&FormJson> {
        self.flat_routes().into_iter().flat_map(|r| r.forms()).collect()
    }

    /// Modal form used to add/edit entities of a type
    pub fn entity_form(&self, entity_type: &str) -> Option<&FormJson> {
        self.flat_routes()
            .into_iter()
            .filter(|r| r.entity_type.as_deref() == Some(entity_type))
            .find_map(|r| r.modal_form.as_ref().or(r.drawer_form.as_ref()))
    }

    /// Page forms that hold top-level report fields (excludes entity forms)
    pub fn page_forms(&self) -> Vec<&FormJson> {
        self.flat_routes()
            .into_iter()
            .filter_map(|r| r.form.as_ref())
            .collect()
    }
}
