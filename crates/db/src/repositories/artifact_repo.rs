//! Repository for the `generated_artifacts` table.

use sqlx::PgPool;
use storyforge_core::types::DbId;

use crate::models::artifact::{CreateArtifact, GeneratedArtifact};
use crate::models::status::TaskKind;

/// Column list for `generated_artifacts` queries.
const COLUMNS: &str = "\
    id, task_id, task_kind_id, subject_key, filename, subfolder, \
    prompt, media_kind, created_at, updated_at";

/// Provides insert-once and lookup operations for generated artifacts.
pub struct ArtifactRepo;

impl ArtifactRepo {
    /// Record an artifact unless `(kind, subject, filename)` already exists.
    ///
    /// Returns `None` when the row was already present; a duplicate is a
    /// no-op, not an error.
    pub async fn create_if_absent(
        pool: &PgPool,
        input: &CreateArtifact,
    ) -> Result<Option<GeneratedArtifact>, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_artifacts \
                 (task_id, task_kind_id, subject_key, filename, subfolder, prompt, media_kind) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (task_kind_id, subject_key, filename) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, GeneratedArtifact>(&query)
            .bind(input.task_id)
            .bind(input.kind.id())
            .bind(&input.subject_key)
            .bind(&input.filename)
            .bind(&input.subfolder)
            .bind(&input.prompt)
            .bind(input.media_kind.as_str())
            .fetch_optional(pool)
            .await?;

        if created.is_none() {
            tracing::debug!(
                subject = %input.subject_key,
                filename = %input.filename,
                "Artifact already recorded, skipping",
            );
        }
        Ok(created)
    }

    /// List artifacts produced by a task, oldest first.
    pub async fn list_by_task(
        pool: &PgPool,
        task_id: DbId,
    ) -> Result<Vec<GeneratedArtifact>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_artifacts \
             WHERE task_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, GeneratedArtifact>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    /// List every artifact recorded for a subject, newest first.
    pub async fn list_by_subject(
        pool: &PgPool,
        kind: TaskKind,
        subject_key: &str,
    ) -> Result<Vec<GeneratedArtifact>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_artifacts \
             WHERE task_kind_id = $1 AND subject_key = $2 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, GeneratedArtifact>(&query)
            .bind(kind.id())
            .bind(subject_key)
            .fetch_all(pool)
            .await
    }

    /// Delete an artifact record. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM generated_artifacts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
