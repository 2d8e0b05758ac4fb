//! Submit-then-poll media generation gateway.
//!
//! [`MediaGateway`] is the seam the orchestration services depend on;
//! [`ComfyUIGateway`] implements it over [`ComfyUIApi`]. Transport errors
//! are logged and mapped to `None` here so callers only see "produced
//! these files" or "produced nothing".

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};

use crate::api::ComfyUIApi;
use crate::history::{job_state, GeneratedOutput, JobState};
use crate::template::{random_seed, TemplateError, TemplateInputs, WorkflowTemplate};

/// Default delay between two history polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Default time budget for an image job.
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(600);
/// Default time budget for a video job.
pub const DEFAULT_VIDEO_TIMEOUT: Duration = Duration::from_secs(3600);

/// How often to poll and how long to wait for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub fn image() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_IMAGE_TIMEOUT,
        }
    }

    pub fn video() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_VIDEO_TIMEOUT,
        }
    }
}

/// Media generation backend used by the orchestration services.
#[async_trait]
pub trait MediaGateway: Send + Sync {
    /// Upload a source image. Returns the name to substitute into the
    /// image placeholder, or `None` if the upload failed.
    async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> Option<String>;

    /// Fill `template` and queue it. `Ok(None)` means the backend did not
    /// accept the job; `Err` means the inputs never reached it.
    async fn submit(
        &self,
        template: &WorkflowTemplate,
        prompt: &str,
        seed: u64,
        image: Option<&str>,
    ) -> Result<Option<String>, TemplateError>;

    /// Poll a queued job until it finishes or `poll.timeout` elapses.
    async fn await_completion(&self, job_id: &str, poll: PollSettings)
        -> Option<Vec<GeneratedOutput>>;

    /// Submit one job with a fresh seed and wait for its files.
    async fn generate(
        &self,
        template: &WorkflowTemplate,
        prompt: &str,
        image: Option<&str>,
        poll: PollSettings,
    ) -> Result<Option<Vec<GeneratedOutput>>, TemplateError> {
        let Some(job_id) = self.submit(template, prompt, random_seed(), image).await? else {
            return Ok(None);
        };
        Ok(self.await_completion(&job_id, poll).await)
    }
}

/// [`MediaGateway`] backed by a single ComfyUI instance.
#[derive(Clone)]
pub struct ComfyUIGateway {
    api: ComfyUIApi,
}

impl ComfyUIGateway {
    pub fn new(api: ComfyUIApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ComfyUIApi {
        &self.api
    }
}

#[async_trait]
impl MediaGateway for ComfyUIGateway {
    async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> Option<String> {
        match self.api.upload_image(filename, bytes).await {
            Ok(uploaded) => {
                tracing::debug!(
                    filename,
                    stored_as = %uploaded.name,
                    subfolder = %uploaded.subfolder,
                    "Uploaded source image",
                );
                Some(uploaded.name)
            }
            Err(e) => {
                tracing::warn!(filename, error = %e, "Image upload failed");
                None
            }
        }
    }

    async fn submit(
        &self,
        template: &WorkflowTemplate,
        prompt: &str,
        seed: u64,
        image: Option<&str>,
    ) -> Result<Option<String>, TemplateError> {
        let filled = template.fill(&TemplateInputs {
            prompt,
            seed,
            image,
        })?;
        let client_id = uuid::Uuid::new_v4().to_string();

        let response = match self.api.submit_workflow(&filled.document, &client_id).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(workflow = %template.title, error = %e, "Workflow submission failed");
                return Ok(None);
            }
        };

        match response.prompt_id {
            Some(job_id) => {
                tracing::info!(
                    workflow = %template.title,
                    job_id = %job_id,
                    seed,
                    queue_number = ?response.number,
                    "Workflow queued",
                );
                Ok(Some(job_id))
            }
            None => {
                tracing::warn!(
                    workflow = %template.title,
                    node_errors = ?response.node_errors,
                    "ComfyUI accepted the request but returned no prompt_id",
                );
                Ok(None)
            }
        }
    }

    async fn await_completion(
        &self,
        job_id: &str,
        poll: PollSettings,
    ) -> Option<Vec<GeneratedOutput>> {
        let deadline = Instant::now() + poll.timeout;
        let mut ticker = tokio::time::interval(poll.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.api.get_history(job_id).await {
                Ok(body) => match job_state(&body, job_id) {
                    JobState::Succeeded(outputs) => {
                        tracing::info!(job_id, files = outputs.len(), "Job finished");
                        return Some(outputs);
                    }
                    JobState::Failed(reason) => {
                        tracing::warn!(
                            job_id,
                            reason = reason.as_deref().unwrap_or("unknown"),
                            "Job failed in ComfyUI",
                        );
                        return None;
                    }
                    JobState::Queued | JobState::Running => {}
                },
                Err(e) => {
                    tracing::warn!(job_id, error = %e, "History poll failed, retrying");
                }
            }

            if Instant::now() >= deadline {
                tracing::warn!(
                    job_id,
                    timeout_secs = poll.timeout.as_secs(),
                    "Gave up waiting for job",
                );
                return None;
            }
        }
    }
}
