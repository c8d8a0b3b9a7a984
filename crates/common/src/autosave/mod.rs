//! Field autosave
//!
//! On blur the client sends the fields it considers dirty. Only values that
//! changed since hydration are written: valid values as-is, blank invalid
//! values as their default (clearing the field), anything else is skipped.

use crate::entities::EntityType;
use crate::forms::FormRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One field submitted for autosave
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveField {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    /// Value the field was rendered with; falls back to the stored value
    #[serde(default)]
    pub hydration_value: Option<Value>,
    /// Written when a required field is cleared
    #[serde(default)]
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutosaveRequest {
    pub fields: Vec<AutosaveField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedField {
    pub name: String,
    pub reason: String,
}

/// Field writes decided for one autosave request
#[derive(Debug, Clone, Default)]
pub struct AutosavePlan {
    /// Values to merge into field data; `null` removes the key
    pub patch: Map<String, Value>,
    pub saved: Vec<String>,
    pub skipped: Vec<SkippedField>,
}

impl AutosavePlan {
    pub fn is_empty(&self) -> bool {
        self.patch.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveOutcome {
    pub saved: Vec<String>,
    pub skipped: Vec<SkippedField>,
    pub last_altered: chrono::DateTime<chrono::Utc>,
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Whether `value` differs from what the field was hydrated with
fn has_changed(value: &Value, baseline: Option<&Value>) -> bool {
    match baseline {
        Some(baseline) => value != baseline,
        None => !is_unset(value),
    }
}

/// Decide which fields of `fields` to write over `current` field data
pub fn plan_autosave(
    registry: &FormRegistry,
    report_type: &str,
    fields: &[AutosaveField],
    current: &Map<String, Value>,
) -> AutosavePlan {
    let mut plan = AutosavePlan::default();
    // sibling view seen by conditional rules: stored data plus this batch
    let mut view = current.clone();
    for field in fields {
        view.insert(field.name.clone(), field.value.clone());
    }

    for field in fields {
        let baseline = field.hydration_value.as_ref().or(current.get(&field.name));
        if !has_changed(&field.value, baseline) {
            continue;
        }

        let Some(schema) = registry.page_schema_for_field(report_type, &field.name) else {
            plan.skipped.push(SkippedField {
                name: field.name.clone(),
                reason: format!("no schema for field {}", field.name),
            });
            continue;
        };
        if field.name.parse::<EntityType>().is_ok()
            || !registry.is_autosave_field(report_type, &field.name)
        {
            plan.skipped.push(SkippedField {
                name: field.name.clone(),
                reason: format!("field {} is not saved on blur", field.name),
            });
            continue;
        }
        // validate_field cannot fail on lookup here; the schema owns the field
        let Some(rule) = schema.field(&field.name).map(|f| &f.rule) else {
            continue;
        };

        match schema.validate_field(&field.name, &view) {
            Ok(()) => {
                plan.patch.insert(field.name.clone(), field.value.clone());
                plan.saved.push(field.name.clone());
            }
            Err(_) if rule.is_blank(Some(&field.value)) => {
                let cleared = field.default_value.clone().unwrap_or(Value::Null);
                plan.patch.insert(field.name.clone(), cleared);
                plan.saved.push(field.name.clone());
            }
            Err(err) => {
                tracing::debug!(field = %field.name, error = %err, "Autosave skipped invalid field");
                plan.skipped.push(SkippedField {
                    name: field.name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    plan
}
