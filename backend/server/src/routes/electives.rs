use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use catalog::{
    Elective,
    payloads::{ElectivePatch, NewElective},
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    auth::RequestContext,
    electives::{
        create_elective, delete_elective, electives_for_student, list_electives, update_elective,
    },
    error::AppError,
    state::AppState,
    utils::{AppJson, AppPath, AppQuery},
};

#[derive(Debug, Default, Deserialize)]
pub struct SemesterQuery {
    pub semester: Option<u32>,
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppQuery(query): AppQuery<SemesterQuery>,
) -> Result<AppJson<Vec<Elective>>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(
        list_electives(state.store(), scope, query.semester).await?,
    ))
}

pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppJson(input): AppJson<NewElective>,
) -> Result<(StatusCode, AppJson<Value>), AppError> {
    let scope = context.require_admin()?;
    let elective = create_elective(state.store(), scope, input).await?;

    Ok((
        StatusCode::CREATED,
        AppJson(json!({ "msg": "Elective added successfully", "elective": elective })),
    ))
}

pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(patch): AppJson<ElectivePatch>,
) -> Result<AppJson<Value>, AppError> {
    let scope = context.require_admin()?;
    let updated = update_elective(state.store(), scope, id, patch).await?;

    Ok(AppJson(json!({ "msg": "Elective updated", "updated": updated })))
}

pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> Result<AppJson<Value>, AppError> {
    let scope = context.require_admin()?;
    delete_elective(state.store(), scope, id).await?;

    Ok(AppJson(json!({ "msg": "Elective deleted" })))
}

pub async fn mine_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<AppJson<Vec<Elective>>, AppError> {
    let student = context.require_student()?;

    Ok(AppJson(electives_for_student(state.store(), student).await?))
}
