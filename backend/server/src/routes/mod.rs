//! HTTP surface. Every handler resolves the caller through
//! [`RequestContext`](crate::auth::RequestContext) and hands the resulting
//! scope to a service function; none of them touch the store directly.
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::{state::AppState, utils::AppJson};

pub mod admin;
pub mod auth;
pub mod electives;
pub mod registrations;
pub mod reports;
pub mod super_admin;

pub async fn index_handler() -> AppJson<Value> {
    AppJson(json!({
        "status": "OK",
        "message": "Elective Subject Registration System API",
        "endpoints": {
            "health": "/health",
            "auth": "/api/auth",
            "electives": "/api/electives",
            "registrations": "/api/registrations",
            "reports": "/api/reports",
            "admin": "/api/admin",
            "superAdmin": "/api/super-admin",
        },
    }))
}

pub async fn health_handler() -> AppJson<Value> {
    AppJson(json!({ "status": "OK", "message": "Server is running" }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/change-password", put(auth::change_password_handler))
        .route(
            "/registrations",
            post(registrations::register_handler).get(registrations::list_handler),
        )
        .route("/registrations/me", get(registrations::mine_handler))
        .route(
            "/electives",
            get(electives::list_handler).post(electives::create_handler),
        )
        .route("/electives/my", get(electives::mine_handler))
        .route(
            "/electives/{id}",
            put(electives::update_handler).delete(electives::delete_handler),
        )
        .route("/admin/upload-students", post(admin::upload_handler))
        .route("/admin/students", get(admin::students_handler))
        .route("/admin/semesters", get(admin::semesters_handler))
        .route("/admin/sections/{semester}", get(admin::sections_handler))
        .route(
            "/admin/elective-types/{semester}",
            get(admin::elective_types_handler),
        )
        .route("/admin/electives/{semester}", get(admin::electives_handler))
        .route("/admin/electives-by-type", get(admin::electives_by_type_handler))
        .route(
            "/admin/filtered-registrations",
            get(admin::filtered_registrations_handler),
        )
        .route("/admin/reconcile", post(admin::reconcile_handler))
        .route("/reports/elective", get(reports::elective_handler))
        .route("/reports/elective-section", get(reports::elective_section_handler))
        .route("/reports/summary", get(reports::summary_handler))
        .route(
            "/super-admin/admins",
            get(super_admin::list_handler).post(super_admin::create_handler),
        )
        .route(
            "/super-admin/admins/{id}",
            put(super_admin::update_handler).delete(super_admin::delete_handler),
        );

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .nest("/api", api)
        .with_state(state)
}
