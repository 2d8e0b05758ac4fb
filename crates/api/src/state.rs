use std::sync::Arc;

use storyforge_pipeline::services::{IllustrationService, PortraitService, VideoService};
use storyforge_pipeline::Orchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: storyforge_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Shared admission and background task tracking.
    pub orchestrator: Arc<Orchestrator>,
    pub portraits: PortraitService,
    pub illustrations: IllustrationService,
    pub videos: VideoService,
}

impl AppState {
    /// Build the per-domain services on top of one orchestrator.
    pub fn new(
        pool: storyforge_db::DbPool,
        config: ServerConfig,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            portraits: PortraitService::new(Arc::clone(&orchestrator)),
            illustrations: IllustrationService::new(Arc::clone(&orchestrator)),
            videos: VideoService::new(Arc::clone(&orchestrator)),
            orchestrator,
        }
    }
}
