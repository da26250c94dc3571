use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::app::{AppState, error_response};
use crate::blueprint::Blueprint;
use crate::llm::catalog;
use crate::project::{Project, ProjectCreate, ProjectStatus};

type ApiError = (StatusCode, String);

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "sitewright" }))
}

pub async fn available_models() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "models": catalog::available_models() }))
}

pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let projects = state
        .store
        .list_projects()
        .await
        .map_err(|err| error_response(&err))?;
    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(request): Json<ProjectCreate>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    if request.topic.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "topic is required".to_string()));
    }

    let project = Project::new(request.topic.trim(), request.config);
    state
        .store
        .save_project(&project)
        .await
        .map_err(|err| error_response(&err))?;
    tracing::info!(project_id = %project.id, topic = %project.topic, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    let project = state
        .store
        .get_project(&project_id)
        .await
        .map_err(|err| error_response(&err))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "project not found".to_string()))?;
    Ok(Json(project))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: ProjectStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut project = state
        .store
        .get_project(&project_id)
        .await
        .map_err(|err| error_response(&err))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "project not found".to_string()))?;

    project.status = update.status;
    state
        .store
        .save_project(&project)
        .await
        .map_err(|err| error_response(&err))?;
    Ok(Json(serde_json::json!({ "status": "updated" })))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state
        .store
        .delete_project(&project_id)
        .await
        .map_err(|err| error_response(&err))?;
    if !deleted {
        return Err((StatusCode::NOT_FOUND, "project not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

pub async fn get_blueprint(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Blueprint>, ApiError> {
    let project = state
        .store
        .get_project(&project_id)
        .await
        .map_err(|err| error_response(&err))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "project not found".to_string()))?;
    let blueprint_id = project
        .blueprint_id
        .as_deref()
        .ok_or_else(|| (StatusCode::NOT_FOUND, "blueprint not generated".to_string()))?;
    let blueprint = state
        .store
        .get_blueprint(&project_id, blueprint_id)
        .await
        .map_err(|err| error_response(&err))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "blueprint not found".to_string()))?;
    Ok(Json(blueprint))
}

pub async fn approve_blueprint(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .pipeline
        .approve_blueprint(&project_id)
        .await
        .map_err(|err| error_response(&err))?;
    Ok(Json(serde_json::json!({ "status": "approved" })))
}
