//! Repository for the `generation_tasks` table.
//!
//! Every status transition is guarded in SQL by the expected current
//! status, so a late or duplicate write can never move a task backwards
//! or out of a terminal state. Transition methods return `true` when the
//! row actually changed.

use sqlx::PgPool;
use storyforge_core::types::DbId;

use crate::models::status::{TaskKind, TaskStatus};
use crate::models::task::{CreateGenerationTask, GenerationTask};

/// Column list for `generation_tasks` queries.
const COLUMNS: &str = "\
    id, task_kind_id, subject_key, task_token, status_id, \
    parameters, prompts, requested_count, produced_count, \
    result_message, error_message, \
    started_at, completed_at, created_at, updated_at";

/// Maximum page size for subject listings.
const MAX_LIMIT: i64 = 100;

/// Provides CRUD and state-transition operations for generation tasks.
pub struct GenerationTaskRepo;

impl GenerationTaskRepo {
    /// Insert a new `pending` task.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGenerationTask,
    ) -> Result<GenerationTask, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_tasks \
                 (task_kind_id, subject_key, task_token, status_id, parameters, requested_count) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationTask>(&query)
            .bind(input.kind.id())
            .bind(&input.subject_key)
            .bind(&input.task_token)
            .bind(TaskStatus::Pending.id())
            .bind(&input.parameters)
            .bind(input.requested_count)
            .fetch_one(pool)
            .await
    }

    /// Find a task by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<GenerationTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_tasks WHERE id = $1");
        sqlx::query_as::<_, GenerationTask>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a task by its caller-chosen correlation token.
    pub async fn find_by_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<GenerationTask>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_tasks WHERE task_token = $1");
        sqlx::query_as::<_, GenerationTask>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// List the most recent tasks for a subject, newest first.
    pub async fn list_by_subject(
        pool: &PgPool,
        kind: TaskKind,
        subject_key: &str,
        limit: i64,
    ) -> Result<Vec<GenerationTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_tasks \
             WHERE task_kind_id = $1 AND subject_key = $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, GenerationTask>(&query)
            .bind(kind.id())
            .bind(subject_key)
            .bind(limit.clamp(1, MAX_LIMIT))
            .fetch_all(pool)
            .await
    }

    // ── State transitions ────────────────────────────────────────────

    /// `pending -> running`, recording `started_at`.
    pub async fn mark_running(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_tasks \
             SET status_id = $2, started_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(TaskStatus::Running.id())
        .bind(TaskStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store the synthesized prompts on a running task.
    pub async fn set_prompts(pool: &PgPool, id: DbId, prompts: &[String]) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_tasks SET prompts = $2 \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(serde_json::json!(prompts))
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Update the produced-item counter on a running task.
    pub async fn set_produced_count(
        pool: &PgPool,
        id: DbId,
        produced: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_tasks SET produced_count = $2 \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(produced)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// `running -> completed` with the final count and result message.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        produced: i32,
        message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_tasks \
             SET status_id = $2, produced_count = $3, result_message = $4, \
                 error_message = NULL, completed_at = NOW() \
             WHERE id = $1 AND status_id = $5",
        )
        .bind(id)
        .bind(TaskStatus::Completed.id())
        .bind(produced)
        .bind(message)
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `pending|running -> failed` with an error message.
    ///
    /// A task that fails before it started gets `started_at = completed_at`
    /// so the timestamp ordering invariant still holds.
    pub async fn fail(pool: &PgPool, id: DbId, message: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_tasks \
             SET status_id = $2, error_message = $3, result_message = NULL, \
                 started_at = COALESCE(started_at, NOW()), completed_at = NOW() \
             WHERE id = $1 AND status_id IN ($4, $5)",
        )
        .bind(id)
        .bind(TaskStatus::Failed.id())
        .bind(message)
        .bind(TaskStatus::Pending.id())
        .bind(TaskStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
