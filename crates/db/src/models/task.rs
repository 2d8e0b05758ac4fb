//! Generation task entity and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use storyforge_core::generation;
use storyforge_core::types::{DbId, Timestamp};

use super::status::{StatusId, TaskKind, TaskStatus};

/// A row from the `generation_tasks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationTask {
    pub id: DbId,
    pub task_kind_id: StatusId,
    pub subject_key: String,
    pub task_token: Option<String>,
    pub status_id: StatusId,
    pub parameters: serde_json::Value,
    pub prompts: serde_json::Value,
    pub requested_count: i32,
    pub produced_count: i32,
    pub result_message: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GenerationTask {
    /// Typed status. Unknown IDs are treated as `failed`.
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_id(self.status_id).unwrap_or(TaskStatus::Failed)
    }

    /// Typed domain kind, `None` for IDs this build does not know.
    pub fn kind(&self) -> Option<TaskKind> {
        TaskKind::from_id(self.task_kind_id)
    }

    /// Synthesized prompts stored on the task (empty before synthesis).
    pub fn prompt_list(&self) -> Vec<String> {
        self.prompts
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Progress percentage derived from status and counters.
    pub fn progress_percent(&self) -> i16 {
        let has_prompts = self
            .prompts
            .as_array()
            .is_some_and(|items| !items.is_empty());
        generation::progress_percent(
            self.status(),
            has_prompts,
            self.produced_count,
            self.requested_count,
        )
    }
}

/// DTO for inserting a new pending task.
#[derive(Debug, Clone)]
pub struct CreateGenerationTask {
    pub kind: TaskKind,
    pub subject_key: String,
    pub task_token: Option<String>,
    pub parameters: serde_json::Value,
    pub requested_count: i32,
}

/// Task record as returned by `GET /tasks/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub id: DbId,
    pub kind: Option<TaskKind>,
    pub subject_key: String,
    pub task_token: Option<String>,
    pub status: TaskStatus,
    pub progress_percent: i16,
    pub parameters: serde_json::Value,
    pub prompts: Vec<String>,
    pub requested_count: i32,
    pub produced_count: i32,
    pub result_message: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<GenerationTask> for TaskView {
    fn from(task: GenerationTask) -> Self {
        Self {
            id: task.id,
            kind: task.kind(),
            status: task.status(),
            progress_percent: task.progress_percent(),
            prompts: task.prompt_list(),
            subject_key: task.subject_key,
            task_token: task.task_token,
            parameters: task.parameters,
            requested_count: task.requested_count,
            produced_count: task.produced_count,
            result_message: task.result_message,
            error_message: task.error_message,
            started_at: task.started_at,
            completed_at: task.completed_at,
            created_at: task.created_at,
        }
    }
}
