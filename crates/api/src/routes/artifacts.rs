use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::artifacts;
use crate::state::AppState;

/// Routes mounted at `/artifacts`.
///
/// ```text
/// GET    /        -> list_artifacts
/// DELETE /{id}    -> delete_artifact
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(artifacts::list_artifacts))
        .route("/{id}", delete(artifacts::delete_artifact))
}
