//! Report entities
//!
//! Entities are JSON objects with a string `id`, stored in arrays under
//! `field_data[<entityType>]` in insertion order. This module formats them
//! into dashboard/drawer view models and performs the add/edit/delete edits
//! on a report's field data.

use crate::errors::{AppError, Result};
use crate::forms::rules::selection_label;
use crate::forms::OTHER_SPECIFY;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

pub type EntityShape = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Plans,
    AccessMeasures,
    Sanctions,
    QualityMeasures,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Plans,
        EntityType::AccessMeasures,
        EntityType::Sanctions,
        EntityType::QualityMeasures,
    ];

    /// Key of the entity array in a report's field data
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Plans => "plans",
            EntityType::AccessMeasures => "accessMeasures",
            EntityType::Sanctions => "sanctions",
            EntityType::QualityMeasures => "qualityMeasures",
        }
    }
}

impl FromStr for EntityType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        EntityType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::InvalidFormat {
                message: format!("unknown entity type {}", s),
            })
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selected value of a radio field, with "Other, specify" replaced by the
/// companion `-otherText` answer
fn radio_value(entity: &EntityShape, label: &str) -> Option<Value> {
    let first = entity.get(label)?.as_array()?.first()?;
    match selection_label(first) {
        Some(OTHER_SPECIFY) => entity.get(&format!("{}-otherText", label)).cloned(),
        Some(value) => Some(Value::String(value.to_string())),
        None => None,
    }
}

/// Every selected value of a checkbox field, with the same substitution
fn checkbox_values(entity: &EntityShape, label: &str) -> Option<Value> {
    let selections = entity.get(label)?.as_array()?;
    let other = entity.get(&format!("{}-otherText", label));
    let values = selections
        .iter()
        .map(|item| match selection_label(item) {
            Some(OTHER_SPECIFY) => other.cloned().unwrap_or(Value::Null),
            Some(value) => Value::String(value.to_string()),
            None => Value::Null,
        })
        .collect();
    Some(Value::Array(values))
}

/// Name of the plan a sanction references by id
fn plan_name(entity: &EntityShape, report_field_data: Option<&Map<String, Value>>) -> Option<Value> {
    let plan_id = match entity.get("sanction_planName")? {
        Value::Object(obj) => obj.get("value")?.as_str()?,
        Value::String(id) => id.as_str(),
        _ => return None,
    };
    report_field_data?
        .get(EntityType::Plans.as_str())?
        .as_array()?
        .iter()
        .find(|plan| plan.get("id").and_then(Value::as_str) == Some(plan_id))?
        .get("name")
        .cloned()
}

/// View model of an entity for drawers and tables
///
/// Unknown entity types produce an empty object; absent source fields are
/// omitted from the output.
pub fn format_entity(
    entity_type: &str,
    entity: Option<&EntityShape>,
    report_field_data: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut out = Map::new();
    let entity_type = match entity_type.parse::<EntityType>() {
        Ok(t) => t,
        Err(_) => {
            warn!(entity_type = %entity_type, "No formatter for entity type");
            return out;
        }
    };
    let Some(entity) = entity else {
        return out;
    };

    let plain = |key: &str| entity.get(key).cloned();
    let mut put = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            out.insert(key.to_string(), value);
        }
    };

    match entity_type {
        EntityType::AccessMeasures => {
            let category = entity
                .get("accessMeasure_generalCategory")
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(selection_label)
                .map(|s| Value::String(s.to_string()));
            put("category", category);
            put("standardDescription", plain("accessMeasure_standardDescription"));
            put("standardType", radio_value(entity, "accessMeasure_standardType"));
            put("provider", radio_value(entity, "accessMeasure_providerType"));
            put("region", radio_value(entity, "accessMeasure_applicableRegion"));
            put("population", radio_value(entity, "accessMeasure_population"));
            put(
                "monitoringMethods",
                checkbox_values(entity, "accessMeasure_monitoringMethods"),
            );
            put(
                "methodFrequency",
                radio_value(entity, "accessMeasure_oversightMethodFrequency"),
            );
        }
        EntityType::Sanctions => {
            put("interventionType", radio_value(entity, "sanction_interventionType"));
            put("interventionTopic", radio_value(entity, "sanction_interventionTopic"));
            put("planName", plan_name(entity, report_field_data));
            put("interventionReason", plain("sanction_interventionReason"));
            put("noncomplianceInstances", plain("sanction_noncomplianceInstances"));
            put("dollarAmount", plain("sanction_dollarAmount"));
            put("assessmentDate", plain("sanction_assessmentDate"));
            put("remediationDate", plain("sanction_remediationDate"));
            put(
                "correctiveActionPlan",
                radio_value(entity, "sanction_correctiveActionPlan"),
            );
        }
        EntityType::QualityMeasures => {
            put("category", plain("qualityMeasure_name"));
            put("description", plain("qualityMeasure_description"));
            put("domain", radio_value(entity, "qualityMeasure_domain"));
            put("nqfNumber", plain("qualityMeasure_nqfNumber"));
            put("reportingPeriod", radio_value(entity, "qualityMeasure_reportingPeriod"));
            put(
                "reportingRateType",
                radio_value(entity, "qualityMeasure_reportingRateType"),
            );
            put("set", radio_value(entity, "qualityMeasure_set"));
        }
        EntityType::Plans => {
            debug!("Plans are a lookup table and have no view model");
        }
    }
    out
}

/// Entities of a type, in insertion order
pub fn list_entities(field_data: &Map<String, Value>, entity_type: EntityType) -> Vec<&EntityShape> {
    field_data
        .get(entity_type.as_str())
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

fn entities_mut(field_data: &mut Map<String, Value>, entity_type: EntityType) -> &mut Vec<Value> {
    let slot = field_data
        .entry(entity_type.as_str())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => items,
        _ => unreachable!("slot was just set to an array"),
    }
}

fn position(items: &[Value], id: &str) -> Option<usize> {
    items
        .iter()
        .position(|item| item.get("id").and_then(Value::as_str) == Some(id))
}

fn not_found(entity_type: EntityType, id: &str) -> AppError {
    AppError::EntityNotFound {
        entity_type: entity_type.to_string(),
        id: id.to_string(),
    }
}

pub fn new_entity_id() -> String {
    Uuid::new_v4().to_string()
}

/// Append an entity under `id`; any id in the payload is replaced
pub fn insert_entity(
    field_data: &mut Map<String, Value>,
    entity_type: EntityType,
    id: &str,
    mut entity: EntityShape,
) {
    entity.insert("id".to_string(), Value::String(id.to_string()));
    entities_mut(field_data, entity_type).push(Value::Object(entity));
}

/// Append an entity under a fresh id, returning the id
pub fn add_entity(
    field_data: &mut Map<String, Value>,
    entity_type: EntityType,
    entity: EntityShape,
) -> String {
    let id = new_entity_id();
    insert_entity(field_data, entity_type, &id, entity);
    id
}

/// Entity with `id`, if present
pub fn find_entity<'a>(
    field_data: &'a Map<String, Value>,
    entity_type: EntityType,
    id: &str,
) -> Option<&'a EntityShape> {
    list_entities(field_data, entity_type)
        .into_iter()
        .find(|entity| entity.get("id").and_then(Value::as_str) == Some(id))
}

/// Overwrite the given fields of an existing entity; its id is kept
pub fn update_entity(
    field_data: &mut Map<String, Value>,
    entity_type: EntityType,
    id: &str,
    entity: EntityShape,
) -> Result<()> {
    let items = entities_mut(field_data, entity_type);
    let index = position(items, id).ok_or_else(|| not_found(entity_type, id))?;
    if let Value::Object(existing) = &mut items[index] {
        for (key, value) in entity {
            if key != "id" {
                existing.insert(key, value);
            }
        }
    }
    Ok(())
}

pub fn delete_entity(
    field_data: &mut Map<String, Value>,
    entity_type: EntityType,
    id: &str,
) -> Result<()> {
    let items = entities_mut(field_data, entity_type);
    let index = position(items, id).ok_or_else(|| not_found(entity_type, id))?;
    items.remove(index);
    Ok(())
}
