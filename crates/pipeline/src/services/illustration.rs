//! Chapter scene illustration.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use storyforge_core::generation::require_non_blank;
use storyforge_core::task::TaskKind;
use storyforge_synthesis::{StructuredIntent, SynthesisCommand};
use validator::Validate;

use crate::error::OrchestrationError;
use crate::orchestrator::{Admission, Orchestrator, TaskReceipt};

/// Body of `POST /illustrations/tasks`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IllustrationRequest {
    #[validate(length(min = 1, max = 128))]
    pub chapter_key: String,
    #[validate(length(max = 20000))]
    pub chapter_text: String,
    #[validate(length(max = 2000))]
    pub scene_description: Option<String>,
    #[validate(length(max = 4000))]
    pub user_intent: Option<String>,
    pub template_title: Option<String>,
    pub count: Option<i32>,
}

#[derive(Clone)]
pub struct IllustrationService {
    orchestrator: Arc<Orchestrator>,
}

impl IllustrationService {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Illustrate a chapter. The chapter text is the synthesis input; the
    /// scene description and caller intent steer it.
    pub async fn create_task(
        &self,
        request: IllustrationRequest,
    ) -> Result<TaskReceipt, OrchestrationError> {
        super::validate_request(&request)?;
        require_non_blank("chapter_text", &request.chapter_text)?;

        let intent = StructuredIntent::new(SynthesisCommand::Scene, request.chapter_text.trim())
            .with_descriptor("scene", request.scene_description.as_deref())
            .with_descriptor("intent", request.user_intent.as_deref());

        let parameters = json!({
            "scene_description": request.scene_description,
            "user_intent": request.user_intent,
            "chapter_length": request.chapter_text.chars().count(),
        });

        self.orchestrator
            .admit(Admission {
                kind: TaskKind::Illustration,
                subject_key: request.chapter_key,
                task_token: None,
                template_title: request.template_title,
                count: request.count,
                intent,
                parameters,
            })
            .await
    }
}
