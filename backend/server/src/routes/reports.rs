use std::sync::Arc;

use axum::extract::State;
use catalog::payloads::{ElectiveRoster, Summary};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::RequestContext,
    error::AppError,
    reports::{elective_roster, summary},
    state::AppState,
    utils::{AppJson, AppQuery},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterQuery {
    pub elective_id: Option<Uuid>,
    pub section: Option<String>,
}

impl RosterQuery {
    fn elective(&self) -> Result<Uuid, AppError> {
        self.elective_id
            .ok_or_else(|| AppError::Validation("Elective ID is required".to_string()))
    }
}

pub async fn elective_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppQuery(query): AppQuery<RosterQuery>,
) -> Result<AppJson<ElectiveRoster>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(
        elective_roster(state.store(), scope, query.elective()?, None).await?,
    ))
}

pub async fn elective_section_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppQuery(query): AppQuery<RosterQuery>,
) -> Result<AppJson<ElectiveRoster>, AppError> {
    let scope = context.require_admin()?;
    let elective = query.elective()?;

    let section = query
        .section
        .map(|section| section.trim().to_string())
        .filter(|section| !section.is_empty())
        .ok_or_else(|| {
            AppError::Validation("Elective ID and section are required".to_string())
        })?;

    Ok(AppJson(
        elective_roster(state.store(), scope, elective, Some(section)).await?,
    ))
}

pub async fn summary_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<AppJson<Summary>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(summary(state.store(), scope).await?))
}
