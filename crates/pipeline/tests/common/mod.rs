//! In-memory doubles for the orchestration collaborators.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use storyforge_comfyui::catalog::{WorkflowCatalog, WorkflowCategory};
use storyforge_comfyui::gateway::{MediaGateway, PollSettings};
use storyforge_comfyui::history::GeneratedOutput;
use storyforge_comfyui::template::{TemplateError, TemplateInputs, WorkflowTemplate};
use storyforge_core::media::MediaKind;
use storyforge_core::task::TaskStatus;
use storyforge_core::types::DbId;
use storyforge_db::models::artifact::CreateArtifact;
use storyforge_db::models::task::{CreateGenerationTask, GenerationTask};
use storyforge_pipeline::orchestrator::{Orchestrator, PipelineSettings};
use storyforge_pipeline::{LedgerError, SourceImageStore, TaskLedger};
use storyforge_synthesis::{PromptSynthesizer, StructuredIntent};
use tokio::sync::Semaphore;

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LedgerState {
    next_id: DbId,
    tasks: BTreeMap<DbId, GenerationTask>,
    /// Every status each task has been observed in, in order.
    history: HashMap<DbId, Vec<TaskStatus>>,
    artifacts: Vec<CreateArtifact>,
}

/// Ledger with the same guarded transitions as the SQL repositories.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    counter_writes_fail: AtomicBool,
}

impl InMemoryLedger {
    /// Make every `set_produced_count` call return a database error.
    pub fn fail_counter_writes(&self) {
        self.counter_writes_fail.store(true, Ordering::SeqCst);
    }

    pub fn task(&self, id: DbId) -> GenerationTask {
        self.state.lock().unwrap().tasks[&id].clone()
    }

    pub fn task_count(&self) -> usize {
        self.state.lock().unwrap().tasks.len()
    }

    pub fn status_history(&self, id: DbId) -> Vec<TaskStatus> {
        self.state.lock().unwrap().history[&id].clone()
    }

    pub fn artifacts(&self) -> Vec<CreateArtifact> {
        self.state.lock().unwrap().artifacts.clone()
    }

    /// Apply `next` if the task is currently in one of `from`.
    fn transition(
        &self,
        id: DbId,
        from: &[TaskStatus],
        next: TaskStatus,
        apply: impl FnOnce(&mut GenerationTask),
    ) -> bool {
        let mut state = self.state.lock().unwrap();
        let Some(task) = state.tasks.get_mut(&id) else {
            return false;
        };
        if !from.contains(&task.status()) {
            return false;
        }
        task.status_id = next.id();
        apply(task);
        state.history.entry(id).or_default().push(next);
        true
    }
}

#[async_trait]
impl TaskLedger for InMemoryLedger {
    async fn create(&self, input: &CreateGenerationTask) -> Result<GenerationTask, LedgerError> {
        let mut state = self.state.lock().unwrap();
        if let Some(token) = &input.task_token {
            if state
                .tasks
                .values()
                .any(|t| t.task_token.as_deref() == Some(token.as_str()))
            {
                return Err(LedgerError::Duplicate(
                    "uq_generation_tasks_task_token".to_string(),
                ));
            }
        }

        state.next_id += 1;
        let now = chrono::Utc::now();
        let task = GenerationTask {
            id: state.next_id,
            task_kind_id: input.kind.id(),
            subject_key: input.subject_key.clone(),
            task_token: input.task_token.clone(),
            status_id: TaskStatus::Pending.id(),
            parameters: input.parameters.clone(),
            prompts: json!([]),
            requested_count: input.requested_count,
            produced_count: 0,
            result_message: None,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());
        state.history.insert(task.id, vec![TaskStatus::Pending]);
        Ok(task)
    }

    async fn find(&self, id: DbId) -> Result<Option<GenerationTask>, LedgerError> {
        Ok(self.state.lock().unwrap().tasks.get(&id).cloned())
    }

    async fn mark_running(&self, id: DbId) -> Result<bool, LedgerError> {
        Ok(self.transition(id, &[TaskStatus::Pending], TaskStatus::Running, |t| {
            t.started_at = Some(chrono::Utc::now());
        }))
    }

    async fn set_prompts(&self, id: DbId, prompts: &[String]) -> Result<(), LedgerError> {
        if let Some(task) = self.state.lock().unwrap().tasks.get_mut(&id) {
            if task.status() == TaskStatus::Running {
                task.prompts = json!(prompts);
            }
        }
        Ok(())
    }

    async fn set_produced_count(&self, id: DbId, produced: i32) -> Result<(), LedgerError> {
        if self.counter_writes_fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Database(sqlx::Error::PoolTimedOut));
        }
        if let Some(task) = self.state.lock().unwrap().tasks.get_mut(&id) {
            if task.status() == TaskStatus::Running {
                task.produced_count = produced;
            }
        }
        Ok(())
    }

    async fn complete(&self, id: DbId, produced: i32, message: &str) -> Result<bool, LedgerError> {
        Ok(self.transition(id, &[TaskStatus::Running], TaskStatus::Completed, |t| {
            t.produced_count = produced;
            t.result_message = Some(message.to_string());
            t.completed_at = Some(chrono::Utc::now());
        }))
    }

    async fn fail(&self, id: DbId, message: &str) -> Result<bool, LedgerError> {
        Ok(self.transition(
            id,
            &[TaskStatus::Pending, TaskStatus::Running],
            TaskStatus::Failed,
            |t| {
                let now = chrono::Utc::now();
                t.error_message = Some(message.to_string());
                t.started_at.get_or_insert(now);
                t.completed_at = Some(now);
            },
        ))
    }

    async fn record_artifact(&self, input: &CreateArtifact) -> Result<bool, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let exists = state.artifacts.iter().any(|a| {
            a.kind == input.kind && a.subject_key == input.subject_key && a.filename == input.filename
        });
        if exists {
            return Ok(false);
        }
        state.artifacts.push(input.clone());
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

/// Returns a fixed prompt list, optionally waiting on a gate first.
pub struct ScriptedSynthesizer {
    prompts: Vec<String>,
    gate: Option<Arc<Semaphore>>,
    panic: bool,
    pub intents: Mutex<Vec<StructuredIntent>>,
}

impl ScriptedSynthesizer {
    pub fn returning(prompts: &[&str]) -> Self {
        Self {
            prompts: prompts.iter().map(|p| p.to_string()).collect(),
            gate: None,
            panic: false,
            intents: Mutex::new(Vec::new()),
        }
    }

    /// Block every call until a permit is added to `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::returning(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.intents.lock().unwrap().len()
    }
}

#[async_trait]
impl PromptSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, intent: &StructuredIntent) -> Vec<String> {
        self.intents.lock().unwrap().push(intent.clone());
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        if self.panic {
            panic!("synthesizer exploded");
        }
        self.prompts.clone()
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Plays back one scripted result per job, in submission order.
/// Jobs beyond the script produce nothing.
#[derive(Default)]
pub struct ScriptedGateway {
    results: Mutex<VecDeque<Option<Vec<GeneratedOutput>>>>,
    upload_fails: bool,
    pub submissions: Mutex<Vec<(String, Option<String>)>>,
    pub uploads: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn with_results(results: Vec<Option<Vec<GeneratedOutput>>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            ..Self::default()
        }
    }

    pub fn failing_uploads() -> Self {
        Self {
            upload_fails: true,
            ..Self::default()
        }
    }

    pub fn submitted_prompts(&self) -> Vec<String> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .map(|(prompt, _)| prompt.clone())
            .collect()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaGateway for ScriptedGateway {
    async fn upload_image(&self, filename: &str, _bytes: Vec<u8>) -> Option<String> {
        self.uploads.lock().unwrap().push(filename.to_string());
        (!self.upload_fails).then(|| format!("uploaded_{filename}"))
    }

    async fn submit(
        &self,
        template: &WorkflowTemplate,
        prompt: &str,
        seed: u64,
        image: Option<&str>,
    ) -> Result<Option<String>, TemplateError> {
        template.fill(&TemplateInputs {
            prompt,
            seed,
            image,
        })?;
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push((prompt.to_string(), image.map(str::to_string)));
        Ok(Some(format!("job-{}", submissions.len())))
    }

    async fn await_completion(
        &self,
        _job_id: &str,
        _poll: PollSettings,
    ) -> Option<Vec<GeneratedOutput>> {
        self.results.lock().unwrap().pop_front().flatten()
    }
}

pub fn image(filename: &str) -> Option<Vec<GeneratedOutput>> {
    Some(vec![GeneratedOutput {
        filename: filename.to_string(),
        subfolder: String::new(),
        kind: MediaKind::from_filename(filename),
    }])
}

// ---------------------------------------------------------------------------
// Source images
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StaticSourceStore {
    pub missing: bool,
}

#[async_trait]
impl SourceImageStore for StaticSourceStore {
    async fn fetch(&self, _filename: &str) -> Option<Vec<u8>> {
        (!self.missing).then(|| vec![0x89, b'P', b'N', b'G'])
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn catalog() -> Arc<WorkflowCatalog> {
    let t2i = json!({
        "3": { "class_type": "KSampler", "inputs": { "seed": "__SEED__" } },
        "6": { "class_type": "CLIPTextEncode", "inputs": { "text": "__PROMPT__" } }
    });
    let i2v = json!({
        "1": { "class_type": "LoadImage", "inputs": { "image": "__IMAGE__" } },
        "2": { "class_type": "WanPrompt", "inputs": { "text": "__PROMPT__", "seed": "__SEED__" } }
    });
    let no_prompt = json!({ "1": { "class_type": "EmptyLatentImage", "inputs": {} } });

    Arc::new(
        WorkflowCatalog::from_templates([
            WorkflowTemplate::new(
                "Portrait SDXL",
                WorkflowCategory::TextToImage,
                t2i.as_object().unwrap().clone(),
            ),
            WorkflowTemplate::new(
                "Broken",
                WorkflowCategory::TextToImage,
                no_prompt.as_object().unwrap().clone(),
            ),
            WorkflowTemplate::new(
                "Wan I2V",
                WorkflowCategory::ImageToVideo,
                i2v.as_object().unwrap().clone(),
            ),
        ])
        .unwrap(),
    )
}

pub struct Harness {
    pub ledger: Arc<InMemoryLedger>,
    pub synthesizer: Arc<ScriptedSynthesizer>,
    pub gateway: Arc<ScriptedGateway>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Harness {
    pub fn new(synthesizer: ScriptedSynthesizer, gateway: ScriptedGateway) -> Self {
        Self::with_sources(synthesizer, gateway, StaticSourceStore::default())
    }

    pub fn with_sources(
        synthesizer: ScriptedSynthesizer,
        gateway: ScriptedGateway,
        sources: StaticSourceStore,
    ) -> Self {
        let ledger = Arc::new(InMemoryLedger::default());
        let synthesizer = Arc::new(synthesizer);
        let gateway = Arc::new(gateway);
        let orchestrator = Arc::new(Orchestrator::new(
            ledger.clone(),
            synthesizer.clone(),
            gateway.clone(),
            Arc::new(sources),
            catalog(),
            PipelineSettings::default(),
        ));
        Self {
            ledger,
            synthesizer,
            gateway,
            orchestrator,
        }
    }

    /// Wait until `task_id` reaches a terminal state and its background
    /// unit has released the guard.
    pub async fn wait_terminal(&self, task_id: DbId) -> GenerationTask {
        for _ in 0..500 {
            let task = self.ledger.task(task_id);
            if task.status().is_terminal() && self.orchestrator.guard().is_empty() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task {task_id} did not finish");
    }
}
