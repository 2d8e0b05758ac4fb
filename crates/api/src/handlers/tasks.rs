//! Handlers for the `/tasks` resource (read-only).

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use storyforge_core::error::CoreError;
use storyforge_core::task::TaskKind;
use storyforge_core::types::DbId;
use storyforge_db::models::artifact::GeneratedArtifact;
use storyforge_db::models::task::TaskView;
use storyforge_db::repositories::{ArtifactRepo, GenerationTaskRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Default page size for `GET /tasks`.
const DEFAULT_LIST_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub kind: TaskKind,
    pub subject: String,
    pub limit: Option<i64>,
}

/// GET /api/v1/tasks/{id}
///
/// Full task record plus derived `progress_percent`.
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TaskView>>> {
    let task = GenerationTaskRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GenerationTask",
            id,
        }))?;
    Ok(Json(DataResponse {
        data: TaskView::from(task),
    }))
}

/// GET /api/v1/tasks/by-token/{token}
pub async fn get_task_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<TaskView>>> {
    let task = GenerationTaskRepo::find_by_token(&state.pool, &token)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("GenerationTask with token '{token}' not found")))?;
    Ok(Json(DataResponse {
        data: TaskView::from(task),
    }))
}

/// GET /api/v1/tasks?kind=portrait&subject=role-1&limit=20
///
/// Newest first.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> AppResult<Json<DataResponse<Vec<TaskView>>>> {
    if query.subject.trim().is_empty() {
        return Err(AppError::BadRequest("subject must not be blank".to_string()));
    }
    let tasks = GenerationTaskRepo::list_by_subject(
        &state.pool,
        query.kind,
        &query.subject,
        query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
    )
    .await?;
    Ok(Json(DataResponse {
        data: tasks.into_iter().map(TaskView::from).collect(),
    }))
}

/// GET /api/v1/tasks/{id}/artifacts
pub async fn list_task_artifacts(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<GeneratedArtifact>>>> {
    if GenerationTaskRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "GenerationTask",
            id,
        }));
    }
    let artifacts = ArtifactRepo::list_by_task(&state.pool, id).await?;
    Ok(Json(DataResponse { data: artifacts }))
}
