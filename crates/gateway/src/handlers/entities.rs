//! Entity handlers: formatted listing and add/edit/delete

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::report_key;
use crate::AppState;
use mcr_common::{
    entities::{EntityShape, EntityType},
    errors::Result,
    reports::{EntityView, Report},
    UserContext,
};

#[derive(Serialize)]
pub struct EntityCreated {
    pub id: String,
    pub report: Report,
}

pub async fn list_entities(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state, id, entity_type)): Path<(String, String, String, String)>,
) -> Result<Json<Vec<EntityView>>> {
    let key = report_key(&report_type, &report_state, &id)?;
    let entity_type: EntityType = entity_type.parse()?;
    Ok(Json(
        state.reports.list_entities(&user, &key, entity_type).await?,
    ))
}

pub async fn add_entity(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state, id, entity_type)): Path<(String, String, String, String)>,
    Json(entity): Json<EntityShape>,
) -> Result<(StatusCode, Json<EntityCreated>)> {
    let key = report_key(&report_type, &report_state, &id)?;
    let entity_type: EntityType = entity_type.parse()?;
    let (entity_id, report) = state
        .reports
        .add_entity(&user, &key, entity_type, entity)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(EntityCreated {
            id: entity_id,
            report,
        }),
    ))
}

pub async fn update_entity(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state, id, entity_type, entity_id)): Path<(
        String,
        String,
        String,
        String,
        String,
    )>,
    Json(entity): Json<EntityShape>,
) -> Result<Json<Report>> {
    let key = report_key(&report_type, &report_state, &id)?;
    let entity_type: EntityType = entity_type.parse()?;
    Ok(Json(
        state
            .reports
            .update_entity(&user, &key, entity_type, &entity_id, entity)
            .await?,
    ))
}

pub async fn delete_entity(
    State(state): State<AppState>,
    user: UserContext,
    Path((report_type, report_state, id, entity_type, entity_id)): Path<(
        String,
        String,
        String,
        String,
        String,
    )>,
) -> Result<Json<Report>> {
    let key = report_key(&report_type, &report_state, &id)?;
    let entity_type: EntityType = entity_type.parse()?;
    Ok(Json(
        state
            .reports
            .delete_entity(&user, &key, entity_type, &entity_id)
            .await?,
    ))
}
