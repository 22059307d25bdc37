use std::sync::Arc;

use axum::{extract::State, http::StatusCode};
use catalog::payloads::{RegisterRequest, RegistrationView};
use serde_json::{Value, json};

use crate::{
    auth::RequestContext,
    error::AppError,
    registration::{my_registrations, register_elective, registrations_in_scope},
    state::AppState,
    utils::AppJson,
};

pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, AppJson<Value>), AppError> {
    let student = context.require_student()?;
    let registration = register_elective(state.store(), student, request.elective_id).await?;

    Ok((
        StatusCode::CREATED,
        AppJson(json!({
            "msg": "Elective registered successfully",
            "registration": registration,
        })),
    ))
}

pub async fn mine_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<AppJson<Vec<RegistrationView>>, AppError> {
    let student = context.require_student()?;

    Ok(AppJson(my_registrations(state.store(), student).await?))
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<AppJson<Vec<RegistrationView>>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(registrations_in_scope(state.store(), scope).await?))
}
