//! Admission of new generation tasks.
//!
//! [`Orchestrator::admit`] is the shared "generate N items for subject S"
//! entry point behind every domain service: it collapses duplicate
//! requests onto the in-flight task, validates, inserts the `pending`
//! row, claims the guard and hands the task to a guarded background
//! unit.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use storyforge_comfyui::catalog::{WorkflowCatalog, WorkflowCategory};
use storyforge_comfyui::gateway::{MediaGateway, PollSettings};
use storyforge_comfyui::template::{WorkflowTemplate, IMAGE_PLACEHOLDER, PROMPT_PLACEHOLDER};
use storyforge_core::error::CoreError;
use storyforge_core::generation::{
    require_non_blank, resolve_item_count, MSG_ALREADY_RUNNING, MSG_GENERATION_FAILED,
    MSG_TASK_CREATED,
};
use storyforge_core::task::{TaskKind, TaskStatus};
use storyforge_core::types::DbId;
use storyforge_db::models::task::CreateGenerationTask;
use storyforge_synthesis::{PromptSynthesizer, StructuredIntent};
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::error::OrchestrationError;
use crate::guard::ConcurrencyGuard;
use crate::ledger::TaskLedger;
use crate::runner::{run_job, Collaborators, GenerationJob};
use crate::source::SourceImageStore;
use crate::spawn::{spawn_guarded, Completion};

/// Poll budgets per job category.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub image_poll: PollSettings,
    pub video_poll: PollSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            image_poll: PollSettings::image(),
            video_poll: PollSettings::video(),
        }
    }
}

/// Answer to a create-task call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReceipt {
    pub task_id: DbId,
    pub status: TaskStatus,
    pub message: String,
}

/// Domain-neutral create-task request built by the services.
#[derive(Debug, Clone)]
pub struct Admission {
    pub kind: TaskKind,
    pub subject_key: String,
    pub task_token: Option<String>,
    pub template_title: Option<String>,
    pub count: Option<i32>,
    pub intent: StructuredIntent,
    /// Domain-specific input stored on the task row.
    pub parameters: serde_json::Value,
}

/// Shared state behind the portrait, illustration and video services.
pub struct Orchestrator {
    deps: Collaborators,
    catalog: Arc<WorkflowCatalog>,
    guard: Arc<ConcurrencyGuard>,
    /// Serializes guard check -> row insert -> guard acquire.
    admission: Mutex<()>,
    tracker: TaskTracker,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(
        ledger: Arc<dyn TaskLedger>,
        synthesizer: Arc<dyn PromptSynthesizer>,
        gateway: Arc<dyn MediaGateway>,
        sources: Arc<dyn SourceImageStore>,
        catalog: Arc<WorkflowCatalog>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            deps: Collaborators {
                ledger,
                synthesizer,
                gateway,
                sources,
            },
            catalog,
            guard: Arc::new(ConcurrencyGuard::new()),
            admission: Mutex::new(()),
            tracker: TaskTracker::new(),
            settings,
        }
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    pub fn guard(&self) -> &ConcurrencyGuard {
        &self.guard
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Create a task for `request`, or join the one already running for
    /// the same subject.
    pub async fn admit(&self, request: Admission) -> Result<TaskReceipt, OrchestrationError> {
        require_non_blank("subject", &request.subject_key)?;
        let subject_key = request.subject_key.trim().to_string();
        let key = request.kind.guard_key(&subject_key);

        let _admission = self.admission.lock().await;

        if let Some(holder) = self.guard.holder(&key) {
            if let Some(receipt) = self.join_existing(holder, &key).await? {
                return Ok(receipt);
            }
        }

        let requested = resolve_item_count(request.count)?;
        let template = self.resolve_template(request.kind, request.template_title.as_deref())?;

        let mut parameters = request.parameters;
        if let Some(map) = parameters.as_object_mut() {
            map.insert("template_title".into(), template.title.clone().into());
            map.insert("count".into(), requested.into());
        }

        let task = self
            .deps
            .ledger
            .create(&CreateGenerationTask {
                kind: request.kind,
                subject_key: subject_key.clone(),
                task_token: request.task_token,
                parameters,
                requested_count: requested,
            })
            .await?;

        if let Err(holder) = self.guard.try_acquire(&key, task.id) {
            // Only reachable if the guard is claimed outside admission.
            self.deps.ledger.fail(task.id, MSG_ALREADY_RUNNING).await?;
            if let Some(receipt) = self.join_existing(holder, &key).await? {
                return Ok(receipt);
            }
            return Err(CoreError::Conflict(format!("{key} is already claimed")).into());
        }

        let job = GenerationJob {
            task_id: task.id,
            kind: request.kind,
            source_image: (request.kind == TaskKind::ImageToVideo).then(|| subject_key.clone()),
            subject_key,
            intent: request.intent,
            template,
            requested,
            poll: self.poll_for(request.kind),
        };
        self.spawn(job, key);

        tracing::info!(
            task_id = task.id,
            kind = request.kind.as_str(),
            subject = %task.subject_key,
            requested,
            "Generation task accepted",
        );
        Ok(TaskReceipt {
            task_id: task.id,
            status: task.status(),
            message: MSG_TASK_CREATED.to_string(),
        })
    }

    /// Stop accepting background work and wait up to `timeout` for running
    /// tasks. Returns `true` if everything finished in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let in_flight = self.tracker.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for generation tasks to finish");
        }
        tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok()
    }

    /// Receipt for the in-flight task holding `key`.
    ///
    /// A holder that already reached a terminal state is only waiting for
    /// its completion callback; its guard entry is dropped and `None` is
    /// returned so the caller is admitted as a new task.
    async fn join_existing(
        &self,
        holder: DbId,
        key: &str,
    ) -> Result<Option<TaskReceipt>, OrchestrationError> {
        let status = self
            .deps
            .ledger
            .find(holder)
            .await?
            .map(|task| task.status())
            .unwrap_or(TaskStatus::Running);
        if status.is_terminal() {
            self.guard.release(key, holder);
            tracing::debug!(task_id = holder, key, "Guard held by a finished task, releasing");
            return Ok(None);
        }
        tracing::debug!(task_id = holder, key, "Request collapsed onto in-flight task");
        Ok(Some(TaskReceipt {
            task_id: holder,
            status,
            message: MSG_ALREADY_RUNNING.to_string(),
        }))
    }

    fn resolve_template(
        &self,
        kind: TaskKind,
        title: Option<&str>,
    ) -> Result<Arc<WorkflowTemplate>, OrchestrationError> {
        let category = category_for(kind);
        let template = self.catalog.resolve(category, title)?;

        if template.placeholder_count(PROMPT_PLACEHOLDER) == 0 {
            return Err(CoreError::Validation(format!(
                "workflow '{}' has no {PROMPT_PLACEHOLDER} slot",
                template.title
            ))
            .into());
        }
        if category == WorkflowCategory::ImageToVideo
            && template.placeholder_count(IMAGE_PLACEHOLDER) == 0
        {
            return Err(CoreError::Validation(format!(
                "workflow '{}' has no {IMAGE_PLACEHOLDER} slot",
                template.title
            ))
            .into());
        }
        Ok(template)
    }

    fn poll_for(&self, kind: TaskKind) -> PollSettings {
        match category_for(kind) {
            WorkflowCategory::TextToImage => self.settings.image_poll,
            WorkflowCategory::ImageToVideo => self.settings.video_poll,
        }
    }

    fn spawn(&self, job: GenerationJob, key: String) {
        let task_id = job.task_id;
        let deps = self.deps.clone();
        let guard = Arc::clone(&self.guard);
        let ledger = Arc::clone(&self.deps.ledger);
        let tracker = self.tracker.clone();

        spawn_guarded(
            &self.tracker,
            async move { run_job(&deps, job).await },
            move |completion| {
                guard.release(&key, task_id);
                match completion {
                    Completion::Finished => {
                        tracing::debug!(task_id, "Generation unit finished");
                    }
                    Completion::Panicked(message) => {
                        tracing::error!(task_id, panic = %message, "Generation unit panicked");
                        tracker.spawn(async move {
                            if let Err(e) = ledger.fail(task_id, MSG_GENERATION_FAILED).await {
                                tracing::error!(task_id, error = %e, "Failed to record task failure");
                            }
                        });
                    }
                    Completion::Cancelled => {
                        tracing::warn!(task_id, "Generation unit cancelled before finishing");
                    }
                }
            },
        );
    }
}

/// Workflow category used by each task kind.
pub fn category_for(kind: TaskKind) -> WorkflowCategory {
    match kind {
        TaskKind::Portrait | TaskKind::Illustration => WorkflowCategory::TextToImage,
        TaskKind::ImageToVideo => WorkflowCategory::ImageToVideo,
    }
}
