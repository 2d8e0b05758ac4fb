use axum::routing::get;
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                    -> list_tasks
/// GET    /by-token/{token}    -> get_task_by_token
/// GET    /{id}                -> get_task
/// GET    /{id}/artifacts      -> list_task_artifacts
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list_tasks))
        .route("/by-token/{token}", get(tasks::get_task_by_token))
        .route("/{id}", get(tasks::get_task))
        .route("/{id}/artifacts", get(tasks::list_task_artifacts))
}
