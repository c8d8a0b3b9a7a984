//! Compiled form schemas and page/field validation

use super::rules::{Requirement, Rule};
use crate::errors::{AppError, FieldErrors};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One named field with its format rule and requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub rule: Rule,
    pub requirement: Requirement,
}

impl FieldSchema {
    pub fn required(name: impl Into<String>, rule: Rule) -> Self {
        Self {
            name: name.into(),
            rule,
            requirement: Requirement::Required,
        }
    }

    pub fn optional(name: impl Into<String>, rule: Rule) -> Self {
        Self {
            name: name.into(),
            rule,
            requirement: Requirement::Optional,
        }
    }

    pub fn when(
        name: impl Into<String>,
        rule: Rule,
        field: impl Into<String>,
        includes: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            rule,
            requirement: Requirement::When {
                field: field.into(),
                includes: includes.into(),
            },
        }
    }

    /// Validate this field against the full set of form values
    pub fn check(&self, data: &Map<String, Value>) -> Result<(), String> {
        let value = data.get(&self.name);

        if self.rule.is_blank(value) {
            return if self.requirement.is_required(data) {
                Err(self.rule.required_message().to_string())
            } else {
                Ok(())
            };
        }

        match value {
            Some(value) => self.rule.check(value, data).map_err(String::from),
            None => Ok(()),
        }
    }
}

/// Ordered set of field schemas for one form or page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    pub id: String,
    pub fields: Vec<FieldSchema>,
}

/// Per-field failures from a whole-form validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub fields: FieldErrors,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let count = errors.fields.len();
        AppError::Validation {
            message: format!("{} field(s) failed validation", count),
            fields: errors.fields,
        }
    }
}

impl FormSchema {
    pub fn new(id: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Whole-form validation (on submit); every failing field is reported
    pub fn validate(&self, data: &Map<String, Value>) -> Result<(), ValidationErrors> {
        let fields: FieldErrors = self
            .fields
            .iter()
            .filter_map(|field| field.check(data).err().map(|msg| (field.name.clone(), msg)))
            .collect();

        if fields.is_empty() {
            Ok(())
        } else {
            tracing::debug!(form = %self.id, failures = fields.len(), "Form validation failed");
            Err(ValidationErrors { fields })
        }
    }

    /// Single-field validation (on blur), evaluated against sibling values
    pub fn validate_field(&self, name: &str, data: &Map<String, Value>) -> crate::errors::Result<()> {
        let field = self.field(name).ok_or_else(|| AppError::InvalidFormat {
            message: format!("no schema for field {} in form {}", name, self.id),
        })?;

        field.check(data).map_err(|message| {
            let mut fields = FieldErrors::new();
            fields.insert(name.to_string(), message.clone());
            AppError::Validation { message, fields }
        })
    }

    /// Combine several schemas into one (whole-report validation)
    pub fn merged(id: impl Into<String>, schemas: impl IntoIterator<Item = FormSchema>) -> Self {
        let fields = schemas.into_iter().flat_map(|s| s.fields).collect();
        Self::new(id, fields)
    }
}
