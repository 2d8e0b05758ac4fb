use axum::routing::get;
use axum::Router;

use crate::handlers::workflows;
use crate::state::AppState;

/// Routes mounted at `/workflows`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(workflows::list_workflows))
}
