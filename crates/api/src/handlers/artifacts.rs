//! Handlers for the `/artifacts` resource.
//!
//! Artifact rows only reference files held by the rendering service;
//! deleting a row does not touch the file itself.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use storyforge_core::error::CoreError;
use storyforge_core::task::TaskKind;
use storyforge_core::types::DbId;
use storyforge_db::models::artifact::GeneratedArtifact;
use storyforge_db::repositories::ArtifactRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ArtifactListQuery {
    pub kind: TaskKind,
    pub subject: String,
}

/// GET /api/v1/artifacts?kind=portrait&subject=role-1
pub async fn list_artifacts(
    State(state): State<AppState>,
    Query(query): Query<ArtifactListQuery>,
) -> AppResult<Json<DataResponse<Vec<GeneratedArtifact>>>> {
    if query.subject.trim().is_empty() {
        return Err(AppError::BadRequest("subject must not be blank".to_string()));
    }
    let artifacts = ArtifactRepo::list_by_subject(&state.pool, query.kind, &query.subject).await?;
    Ok(Json(DataResponse { data: artifacts }))
}

/// DELETE /api/v1/artifacts/{id}
pub async fn delete_artifact(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ArtifactRepo::delete(&state.pool, id).await? {
        tracing::info!(artifact_id = id, "Artifact record deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "GeneratedArtifact",
            id,
        }))
    }
}
