use std::sync::Arc;

use axum::extract::State;
use catalog::{
    Elective, ElectiveType,
    payloads::{ReconcileReport, RegistrationView, StudentProfile, UploadRequest, UploadResponse},
};
use serde::Deserialize;

use crate::{
    auth::{RequestContext, Scope},
    electives::electives_by_type,
    error::AppError,
    ingest::ingest_students,
    registration::reconcile_scope,
    reports::{
        RegistrationFilter, electives_for_semester, elective_types, filtered_registrations,
        list_students, sections, semesters,
    },
    state::AppState,
    utils::{AppJson, AppPath, AppQuery},
};

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppJson(request): AppJson<UploadRequest>,
) -> Result<AppJson<UploadResponse>, AppError> {
    let scope = context.require_admin()?;

    let branch = match scope {
        Scope::Branch(branch) => branch,
        Scope::All => request
            .branch
            .ok_or_else(|| AppError::Validation("Branch is required".to_string()))?,
    };

    let results = ingest_students(
        state.store(),
        request.rows,
        branch,
        scope,
        state.config.bcrypt_cost,
    )
    .await?;

    Ok(AppJson(UploadResponse {
        msg: "Student upload completed".to_string(),
        results,
    }))
}

pub async fn students_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<AppJson<Vec<StudentProfile>>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(list_students(state.store(), scope).await?))
}

pub async fn semesters_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<AppJson<Vec<u32>>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(semesters(state.store(), scope).await?))
}

pub async fn sections_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppPath(semester): AppPath<u32>,
) -> Result<AppJson<Vec<String>>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(sections(state.store(), scope, semester).await?))
}

pub async fn elective_types_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppPath(semester): AppPath<u32>,
) -> Result<AppJson<Vec<ElectiveType>>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(elective_types(state.store(), scope, semester).await?))
}

pub async fn electives_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppPath(semester): AppPath<u32>,
) -> Result<AppJson<Vec<Elective>>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(
        electives_for_semester(state.store(), scope, semester).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct TypeQuery {
    #[serde(rename = "type")]
    pub elective_type: Option<ElectiveType>,
    pub semester: Option<u32>,
}

pub async fn electives_by_type_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppQuery(query): AppQuery<TypeQuery>,
) -> Result<AppJson<Vec<Elective>>, AppError> {
    let scope = context.require_admin()?;
    let elective_type = query
        .elective_type
        .ok_or_else(|| AppError::Validation("'type' is required".to_string()))?;

    Ok(AppJson(
        electives_by_type(state.store(), scope, elective_type, query.semester).await?,
    ))
}

pub async fn filtered_registrations_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
    AppQuery(filter): AppQuery<RegistrationFilter>,
) -> Result<AppJson<Vec<RegistrationView>>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(
        filtered_registrations(state.store(), scope, filter).await?,
    ))
}

pub async fn reconcile_handler(
    State(state): State<Arc<AppState>>,
    context: RequestContext,
) -> Result<AppJson<ReconcileReport>, AppError> {
    let scope = context.require_admin()?;

    Ok(AppJson(reconcile_scope(state.store(), scope).await?))
}
