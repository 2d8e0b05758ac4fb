use axum::extract::State;
use axum::Json;
use serde::Serialize;
use storyforge_comfyui::catalog::{WorkflowCatalog, WorkflowCategory};

use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CategoryWorkflows {
    pub default: Option<String>,
    pub titles: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowListing {
    pub text_to_image: CategoryWorkflows,
    pub image_to_video: CategoryWorkflows,
}

fn listing(catalog: &WorkflowCatalog, category: WorkflowCategory) -> CategoryWorkflows {
    CategoryWorkflows {
        default: catalog.default_title(category).map(str::to_string),
        titles: catalog.titles(category),
    }
}

/// GET /api/v1/workflows -- selectable workflow titles per category.
pub async fn list_workflows(State(state): State<AppState>) -> Json<DataResponse<WorkflowListing>> {
    let catalog = state.orchestrator.catalog();
    Json(DataResponse {
        data: WorkflowListing {
            text_to_image: listing(catalog, WorkflowCategory::TextToImage),
            image_to_video: listing(catalog, WorkflowCategory::ImageToVideo),
        },
    })
}
