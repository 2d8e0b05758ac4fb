pub mod artifacts;
pub mod generation;
pub mod health;
pub mod tasks;
pub mod workflows;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /portraits/tasks              create portrait task (POST)
/// /illustrations/tasks          create illustration task (POST)
/// /videos/tasks                 create image-to-video task (POST)
///
/// /tasks                        list tasks for a subject
/// /tasks/by-token/{token}       look up a task by caller token
/// /tasks/{id}                   task status and progress
/// /tasks/{id}/artifacts         artifacts produced by a task
///
/// /artifacts                    list artifacts for a subject
/// /artifacts/{id}               delete an artifact record (DELETE)
///
/// /workflows                    workflow titles per category
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(generation::router())
        .nest("/tasks", tasks::router())
        .nest("/artifacts", artifacts::router())
        .nest("/workflows", workflows::router())
}
