//! Task ledger seam.
//!
//! The orchestration services write every task transition through
//! [`TaskLedger`]. [`PgTaskLedger`] forwards to the repositories in
//! `storyforge-db`; tests substitute an in-memory implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use storyforge_core::types::DbId;
use storyforge_db::models::artifact::CreateArtifact;
use storyforge_db::models::task::{CreateGenerationTask, GenerationTask};
use storyforge_db::repositories::{ArtifactRepo, GenerationTaskRepo};

use crate::error::LedgerError;

/// Persistent record of generation tasks and their artifacts.
///
/// Status writes return `false` when the guarded transition did not apply
/// (the task was not in the expected state).
#[async_trait]
pub trait TaskLedger: Send + Sync {
    async fn create(&self, input: &CreateGenerationTask) -> Result<GenerationTask, LedgerError>;

    async fn find(&self, id: DbId) -> Result<Option<GenerationTask>, LedgerError>;

    async fn mark_running(&self, id: DbId) -> Result<bool, LedgerError>;

    async fn set_prompts(&self, id: DbId, prompts: &[String]) -> Result<(), LedgerError>;

    async fn set_produced_count(&self, id: DbId, produced: i32) -> Result<(), LedgerError>;

    async fn complete(&self, id: DbId, produced: i32, message: &str) -> Result<bool, LedgerError>;

    async fn fail(&self, id: DbId, message: &str) -> Result<bool, LedgerError>;

    /// Insert an artifact once. `Ok(false)` means it was already recorded.
    async fn record_artifact(&self, input: &CreateArtifact) -> Result<bool, LedgerError>;
}

/// [`TaskLedger`] over PostgreSQL.
#[derive(Clone)]
pub struct PgTaskLedger {
    pool: PgPool,
}

impl PgTaskLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskLedger for PgTaskLedger {
    async fn create(&self, input: &CreateGenerationTask) -> Result<GenerationTask, LedgerError> {
        GenerationTaskRepo::create(&self.pool, input)
            .await
            .map_err(LedgerError::from_sqlx)
    }

    async fn find(&self, id: DbId) -> Result<Option<GenerationTask>, LedgerError> {
        Ok(GenerationTaskRepo::find_by_id(&self.pool, id).await?)
    }

    async fn mark_running(&self, id: DbId) -> Result<bool, LedgerError> {
        Ok(GenerationTaskRepo::mark_running(&self.pool, id).await?)
    }

    async fn set_prompts(&self, id: DbId, prompts: &[String]) -> Result<(), LedgerError> {
        Ok(GenerationTaskRepo::set_prompts(&self.pool, id, prompts).await?)
    }

    async fn set_produced_count(&self, id: DbId, produced: i32) -> Result<(), LedgerError> {
        Ok(GenerationTaskRepo::set_produced_count(&self.pool, id, produced).await?)
    }

    async fn complete(&self, id: DbId, produced: i32, message: &str) -> Result<bool, LedgerError> {
        Ok(GenerationTaskRepo::complete(&self.pool, id, produced, message).await?)
    }

    async fn fail(&self, id: DbId, message: &str) -> Result<bool, LedgerError> {
        Ok(GenerationTaskRepo::fail(&self.pool, id, message).await?)
    }

    async fn record_artifact(&self, input: &CreateArtifact) -> Result<bool, LedgerError> {
        let created = ArtifactRepo::create_if_absent(&self.pool, input).await?;
        Ok(created.is_some())
    }
}
