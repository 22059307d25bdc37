use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use catalog::payloads::{AdminPatch, AdminView, NewAdmin};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    admins::{create_admin, delete_admin, list_admins, update_admin},
    auth::RequestContext,
    error::AppError,
    state::AppState,
    utils::{AppJson, AppPath},
};

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<AppJson<Vec<AdminView>>, AppError> {
    context.require_super_admin()?;

    Ok(AppJson(list_admins(state.store()).await?))
}

pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppJson(input): AppJson<NewAdmin>,
) -> Result<(StatusCode, AppJson<AdminView>), AppError> {
    context.require_super_admin()?;
    let admin = create_admin(state.store(), input, state.config.bcrypt_cost).await?;

    Ok((StatusCode::CREATED, AppJson(admin)))
}

pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(patch): AppJson<AdminPatch>,
) -> Result<AppJson<AdminView>, AppError> {
    context.require_super_admin()?;

    Ok(AppJson(
        update_admin(state.store(), id, patch, state.config.bcrypt_cost).await?,
    ))
}

pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppPath(id): AppPath<Uuid>,
) -> Result<AppJson<Value>, AppError> {
    let caller = context.require_super_admin()?;
    delete_admin(state.store(), caller, id).await?;

    Ok(AppJson(json!({ "msg": "Admin deleted successfully" })))
}
