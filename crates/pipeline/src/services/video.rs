//! Image-to-video generation.
//!
//! The subject is a previously generated image. The background unit reads
//! it through the configured `SourceImageStore`, uploads it to the
//! gateway, then runs a single image-to-video job.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use storyforge_core::task::TaskKind;
use storyforge_synthesis::{StructuredIntent, SynthesisCommand};
use validator::Validate;

use crate::error::OrchestrationError;
use crate::orchestrator::{Admission, Orchestrator, TaskReceipt};

/// Body of `POST /videos/tasks`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VideoRequest {
    #[validate(length(min = 1, max = 512))]
    pub image_filename: String,
    /// Caller correlation token, unique across tasks.
    #[validate(length(min = 1, max = 128))]
    pub task_token: Option<String>,
    #[validate(length(max = 4000))]
    pub user_intent: Option<String>,
    pub template_title: Option<String>,
}

#[derive(Clone)]
pub struct VideoService {
    orchestrator: Arc<Orchestrator>,
}

impl VideoService {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub async fn create_task(
        &self,
        request: VideoRequest,
    ) -> Result<TaskReceipt, OrchestrationError> {
        super::validate_request(&request)?;

        let user_intent = request.user_intent.as_deref().unwrap_or_default().trim();
        let intent = StructuredIntent::new(SynthesisCommand::VideoMotion, user_intent)
            .with_descriptor("image", Some(&request.image_filename));

        let parameters = json!({ "user_intent": request.user_intent });

        self.orchestrator
            .admit(Admission {
                kind: TaskKind::ImageToVideo,
                subject_key: request.image_filename,
                task_token: request.task_token,
                template_title: request.template_title,
                count: None,
                intent,
                parameters,
            })
            .await
    }
}
