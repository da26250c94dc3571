pub mod download;
pub mod generate;
pub mod projects;

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

use crate::pipeline::{NotFound, Pipeline, Precondition};
use crate::store::{DeleteLocked, ProjectStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProjectStore>,
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(projects::health))
        .route("/api/models", get(projects::available_models))
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/:project_id",
            get(projects::get_project).delete(projects::delete_project),
        )
        .route(
            "/api/projects/:project_id/status",
            put(projects::update_status),
        )
        .route(
            "/api/projects/:project_id/blueprint",
            get(projects::get_blueprint),
        )
        .route(
            "/api/projects/:project_id/blueprint/approve",
            post(projects::approve_blueprint),
        )
        .route(
            "/api/projects/:project_id/generate/blueprint",
            get(generate::generate_blueprint),
        )
        .route(
            "/api/projects/:project_id/generate/content",
            get(generate::generate_content),
        )
        .route(
            "/api/projects/:project_id/generate/website",
            get(generate::generate_website),
        )
        .route(
            "/api/projects/:project_id/preview/*path",
            get(download::preview_file),
        )
        .route(
            "/api/projects/:project_id/download",
            get(download::download_website),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Map a pipeline/store error onto an HTTP status: missing records are 404,
/// precondition violations 400, locked deletions 409, everything else 500.
pub(crate) fn error_response(err: &anyhow::Error) -> (StatusCode, String) {
    if let Some(not_found) = err.downcast_ref::<NotFound>() {
        return (StatusCode::NOT_FOUND, not_found.to_string());
    }
    if let Some(precondition) = err.downcast_ref::<Precondition>() {
        return (StatusCode::BAD_REQUEST, precondition.to_string());
    }
    if let Some(locked) = err.downcast_ref::<DeleteLocked>() {
        return (StatusCode::CONFLICT, locked.to_string());
    }
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
}
