use std::sync::Arc;

use axum::extract::State;
use catalog::payloads::{ChangePasswordRequest, LoginRequest, LoginResponse};
use serde_json::{Value, json};

use crate::{
    admins::{change_password, login},
    auth::RequestContext,
    error::AppError,
    state::AppState,
    utils::AppJson,
};

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<AppJson<LoginResponse>, AppError> {
    Ok(AppJson(login(state.store(), &state.tokens, request).await?))
}

pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppJson(request): AppJson<ChangePasswordRequest>,
) -> Result<AppJson<Value>, AppError> {
    let admin = context.require_staff()?;

    change_password(
        state.store(),
        admin,
        request.current_password,
        request.new_password,
        state.config.bcrypt_cost,
    )
    .await?;

    Ok(AppJson(json!({ "msg": "Password updated successfully" })))
}
