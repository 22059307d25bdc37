//! Backend of an elective registration platform for a college.
//!
//! Students pick one elective per slot of their semester. Branch admins
//! manage electives and students of their own branch; super-admins manage
//! everything, including admin accounts.
//!
//!
//!
//! # Records
//!
//! - **Student**: roll number (unique), name, semester, section, branch, and
//!   `selectedElectives`, a cache of the current pick per slot
//! - **Elective**: code (unique), type (`professional` 1-6, `open` 1-3),
//!   number, semester, branch
//! - **Registration**: the ledger. One row per student and slot, enforced by
//!   the store's unique index
//! - **Admin**: username (unique), role `admin` (with branch) or `super_admin`
//!
//! A slot is `(semester, electiveType, electiveNumber)`. Several electives may
//! share a slot; a student takes exactly one of them.
//!
//!
//!
//! # Notes
//!
//! ## Ledger and cache
//! The ledger is authoritative. `selectedElectives` is rebuilt from it after
//! every registration and can be rebuilt for a whole branch through
//! `POST /api/admin/reconcile`, so a failed cache write never loses data.
//!
//! ## Scoping
//! Tokens carry the role and, for students and admins, the branch. Handlers
//! turn the role into a [`Scope`](auth::Scope) once; every service filters by
//! that scope. An elective of another branch is reported exactly like a
//! missing one.
//!
//!
//!
//! # Setup
//!
//! | Variable | Default |
//! |---|---|
//! | `RUST_PORT` | `5000` |
//! | `REDIS_URL` | unset, records stay in memory |
//! | `TOKEN_SECRET` | required, `/run/secrets/TOKEN_SECRET` or env |
//! | `TOKEN_TTL_HOURS` | `24` |
//! | `BCRYPT_COST` | `10` |
//! | `SEED_ADMINS` | `true` |
//! | `DEFAULT_ADMIN_PASSWORD` | `admin123` |
//! | `SUPER_ADMIN_USERNAME`, `SUPER_ADMIN_PASSWORD` | unset |
//!
//! Logs follow `RUST_LOG`.
//! ```sh
//! RUST_LOG=info TOKEN_SECRET=dev cargo run -p electives
//! ```
use std::time::Duration;

use axum::http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod admins;
pub mod auth;
pub mod config;
pub mod database;
pub mod electives;
pub mod error;
pub mod ingest;
pub mod registration;
pub mod reports;
pub mod routes;
pub mod state;
pub mod utils;

use admins::seed_admins;
use state::AppState;

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    if state.config.seed_admins {
        info!("Seeding admin accounts...");
        seed_admins(state.store(), &state.config).await?;
    }

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let app = routes::router(state.clone())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
