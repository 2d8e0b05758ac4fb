//! Handlers for the create-task endpoints.
//!
//! Each call returns `202 Accepted` with `{task_id, status, message}` as
//! soon as the task row exists; generation continues in the background.
//! A request for a subject that is already generating returns the
//! in-flight task instead of creating a new one.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use storyforge_pipeline::services::{IllustrationRequest, PortraitRequest, VideoRequest};
use storyforge_pipeline::TaskReceipt;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

fn accepted(receipt: TaskReceipt) -> impl IntoResponse {
    (StatusCode::ACCEPTED, Json(DataResponse { data: receipt }))
}

/// POST /api/v1/portraits/tasks
pub async fn create_portrait_task(
    State(state): State<AppState>,
    Json(input): Json<PortraitRequest>,
) -> AppResult<impl IntoResponse> {
    let receipt = state.portraits.create_task(input).await?;
    Ok(accepted(receipt))
}

/// POST /api/v1/illustrations/tasks
pub async fn create_illustration_task(
    State(state): State<AppState>,
    Json(input): Json<IllustrationRequest>,
) -> AppResult<impl IntoResponse> {
    let receipt = state.illustrations.create_task(input).await?;
    Ok(accepted(receipt))
}

/// POST /api/v1/videos/tasks
pub async fn create_video_task(
    State(state): State<AppState>,
    Json(input): Json<VideoRequest>,
) -> AppResult<impl IntoResponse> {
    let receipt = state.videos.create_task(input).await?;
    Ok(accepted(receipt))
}
