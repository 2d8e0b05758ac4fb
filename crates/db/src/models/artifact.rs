//! Generated artifact entity and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use storyforge_core::media::MediaKind;
use storyforge_core::types::{DbId, Timestamp};

use super::status::{StatusId, TaskKind};

/// A row from the `generated_artifacts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeneratedArtifact {
    pub id: DbId,
    pub task_id: DbId,
    pub task_kind_id: StatusId,
    pub subject_key: String,
    pub filename: String,
    pub subfolder: String,
    pub prompt: Option<String>,
    pub media_kind: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GeneratedArtifact {
    /// Typed media kind; falls back to classifying by filename.
    pub fn kind(&self) -> MediaKind {
        MediaKind::parse(&self.media_kind).unwrap_or_else(|| MediaKind::from_filename(&self.filename))
    }
}

/// DTO for recording an artifact produced by a generation job.
#[derive(Debug, Clone)]
pub struct CreateArtifact {
    pub task_id: DbId,
    pub kind: TaskKind,
    pub subject_key: String,
    pub filename: String,
    pub subfolder: String,
    pub prompt: Option<String>,
    pub media_kind: MediaKind,
}
