//! Background unit of work for one generation task.
//!
//! Phases run strictly in order: `running` transition, source upload
//! (video only), prompt synthesis, one gateway job per requested item,
//! artifact persistence, terminal write. Releasing the concurrency guard
//! is the caller's job (see [`crate::spawn::spawn_guarded`]).

use std::sync::Arc;

use storyforge_comfyui::gateway::{MediaGateway, PollSettings};
use storyforge_comfyui::history::GeneratedOutput;
use storyforge_comfyui::template::WorkflowTemplate;
use storyforge_core::generation::{
    completed_message, MSG_GENERATION_FAILED, MSG_NO_PROMPTS, MSG_SOURCE_UNAVAILABLE,
};
use storyforge_core::task::TaskKind;
use storyforge_core::types::DbId;
use storyforge_db::models::artifact::CreateArtifact;
use storyforge_synthesis::{PromptSynthesizer, StructuredIntent};

use crate::error::LedgerError;
use crate::ledger::TaskLedger;
use crate::source::SourceImageStore;

/// External collaborators shared by every task.
#[derive(Clone)]
pub struct Collaborators {
    pub ledger: Arc<dyn TaskLedger>,
    pub synthesizer: Arc<dyn PromptSynthesizer>,
    pub gateway: Arc<dyn MediaGateway>,
    pub sources: Arc<dyn SourceImageStore>,
}

/// Everything the background unit needs, fixed at admission time.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub task_id: DbId,
    pub kind: TaskKind,
    pub subject_key: String,
    pub intent: StructuredIntent,
    pub template: Arc<WorkflowTemplate>,
    pub requested: i32,
    /// Image to fetch and upload before generating.
    pub source_image: Option<String>,
    pub poll: PollSettings,
}

/// Run `job` to a terminal state.
///
/// A ledger error aborts the run; the task is then failed on a best-effort
/// basis so it does not stay `running`.
pub async fn run_job(deps: &Collaborators, job: GenerationJob) {
    let task_id = job.task_id;
    if let Err(e) = execute(deps, &job).await {
        tracing::error!(task_id, error = %e, "Generation task aborted");
        if let Err(e) = deps.ledger.fail(task_id, MSG_GENERATION_FAILED).await {
            tracing::error!(task_id, error = %e, "Failed to record task failure");
        }
    }
}

async fn execute(deps: &Collaborators, job: &GenerationJob) -> Result<(), LedgerError> {
    let task_id = job.task_id;

    if !deps.ledger.mark_running(task_id).await? {
        tracing::warn!(task_id, "Task is no longer pending, skipping");
        return Ok(());
    }

    let image = match &job.source_image {
        Some(filename) => match upload_source(deps, filename).await {
            Some(uploaded) => Some(uploaded),
            None => {
                tracing::warn!(task_id, source = %filename, "Source image unavailable");
                deps.ledger.fail(task_id, MSG_SOURCE_UNAVAILABLE).await?;
                return Ok(());
            }
        },
        None => None,
    };

    let prompts = deps.synthesizer.synthesize(&job.intent).await;
    if prompts.is_empty() {
        tracing::warn!(task_id, subject = %job.subject_key, "No prompts synthesized");
        deps.ledger.fail(task_id, MSG_NO_PROMPTS).await?;
        return Ok(());
    }
    deps.ledger.set_prompts(task_id, &prompts).await?;
    tracing::info!(
        task_id,
        prompts = prompts.len(),
        requested = job.requested,
        "Prompts ready, generating",
    );

    let mut produced = 0;
    for index in 0..job.requested {
        let prompt = &prompts[index as usize % prompts.len()];
        match deps
            .gateway
            .generate(&job.template, prompt, image.as_deref(), job.poll)
            .await
        {
            Ok(Some(outputs)) if outputs.is_empty() => {
                tracing::warn!(task_id, item = index, "Job finished without output files");
            }
            Ok(Some(outputs)) => produced += persist_outputs(deps, job, prompt, outputs).await,
            Ok(None) => {
                tracing::warn!(task_id, item = index, "Generation job produced nothing");
            }
            Err(e) => {
                tracing::warn!(task_id, item = index, error = %e, "Workflow could not be filled");
            }
        }
        if let Err(e) = deps.ledger.set_produced_count(task_id, produced).await {
            tracing::warn!(task_id, produced, error = %e, "Failed to update produced count");
        }
    }

    if produced > 0 {
        deps.ledger
            .complete(task_id, produced, &completed_message(produced))
            .await?;
        tracing::info!(task_id, produced, "Generation task completed");
    } else {
        deps.ledger.fail(task_id, MSG_GENERATION_FAILED).await?;
        tracing::warn!(task_id, "Generation task produced no artifacts");
    }
    Ok(())
}

async fn upload_source(deps: &Collaborators, filename: &str) -> Option<String> {
    let bytes = deps.sources.fetch(filename).await?;
    let upload_name = filename.rsplit('/').next().unwrap_or(filename);
    deps.gateway.upload_image(upload_name, bytes).await
}

/// Record each output once. Returns how many new artifacts were stored.
async fn persist_outputs(
    deps: &Collaborators,
    job: &GenerationJob,
    prompt: &str,
    outputs: Vec<GeneratedOutput>,
) -> i32 {
    let mut stored = 0;
    for output in outputs {
        let artifact = CreateArtifact {
            task_id: job.task_id,
            kind: job.kind,
            subject_key: job.subject_key.clone(),
            filename: output.filename,
            subfolder: output.subfolder,
            prompt: Some(prompt.to_string()),
            media_kind: output.kind,
        };
        match deps.ledger.record_artifact(&artifact).await {
            Ok(true) => stored += 1,
            Ok(false) => {
                tracing::debug!(
                    task_id = job.task_id,
                    filename = %artifact.filename,
                    "Artifact already recorded",
                );
            }
            Err(e) => {
                tracing::error!(
                    task_id = job.task_id,
                    filename = %artifact.filename,
                    error = %e,
                    "Failed to record artifact",
                );
            }
        }
    }
    stored
}
