//! Create-task routes, one per generation domain.

use axum::routing::post;
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// ```text
/// POST   /portraits/tasks       -> create_portrait_task
/// POST   /illustrations/tasks   -> create_illustration_task
/// POST   /videos/tasks          -> create_video_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/portraits/tasks", post(generation::create_portrait_task))
        .route(
            "/illustrations/tasks",
            post(generation::create_illustration_task),
        )
        .route("/videos/tasks", post(generation::create_video_task))
}
