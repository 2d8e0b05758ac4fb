//! Character portrait generation.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use storyforge_core::task::TaskKind;
use storyforge_synthesis::{StructuredIntent, SynthesisCommand};
use validator::Validate;

use crate::error::OrchestrationError;
use crate::orchestrator::{Admission, Orchestrator, TaskReceipt};

/// Body of `POST /portraits/tasks`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PortraitRequest {
    #[validate(length(min = 1, max = 128))]
    pub role_id: String,
    #[validate(length(max = 128))]
    pub role_name: Option<String>,
    #[validate(length(max = 2000))]
    pub appearance: Option<String>,
    #[validate(length(max = 2000))]
    pub personality: Option<String>,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub user_intent: String,
    pub template_title: Option<String>,
    pub count: Option<i32>,
}

/// Generates portraits for a story role; one task per role at a time.
#[derive(Clone)]
pub struct PortraitService {
    orchestrator: Arc<Orchestrator>,
}

impl PortraitService {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn create_task(
        &self,
        request: PortraitRequest,
    ) -> Result<TaskReceipt, OrchestrationError> {
        super::validate_request(&request)?;

        let intent = StructuredIntent::new(SynthesisCommand::Portrait, request.user_intent.trim())
            .with_descriptor("name", request.role_name.as_deref())
            .with_descriptor("appearance", request.appearance.as_deref())
            .with_descriptor("personality", request.personality.as_deref());

        let parameters = json!({
            "role_name": request.role_name,
            "appearance": request.appearance,
            "personality": request.personality,
            "user_intent": request.user_intent,
        });

        self.orchestrator
            .admit(Admission {
                kind: TaskKind::Portrait,
                subject_key: request.role_id,
                task_token: None,
                template_title: request.template_title,
                count: request.count,
                intent,
                parameters,
            })
            .await
    }
}
