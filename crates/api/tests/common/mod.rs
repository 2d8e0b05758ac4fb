//! Shared helpers for API integration tests.
//!
//! The router runs against a real (per-test) database while prompt
//! synthesis and the rendering backend are replaced by in-process stubs,
//! so no network access is needed.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

use storyforge_api::config::ServerConfig;
use storyforge_api::router::build_app_router;
use storyforge_api::state::AppState;
use storyforge_comfyui::catalog::{WorkflowCatalog, WorkflowCategory};
use storyforge_comfyui::gateway::{MediaGateway, PollSettings};
use storyforge_comfyui::history::GeneratedOutput;
use storyforge_comfyui::template::{TemplateError, TemplateInputs, WorkflowTemplate};
use storyforge_core::media::MediaKind;
use storyforge_pipeline::{Orchestrator, PgTaskLedger, PipelineSettings, SourceImageStore};
use storyforge_synthesis::{PromptSynthesizer, StructuredIntent};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
    }
}

// ---------------------------------------------------------------------------
// Stub collaborators
// ---------------------------------------------------------------------------

/// Returns two fixed prompts for every intent.
pub struct StubSynthesizer;

#[async_trait]
impl PromptSynthesizer for StubSynthesizer {
    async fn synthesize(&self, intent: &StructuredIntent) -> Vec<String> {
        vec![
            format!("{} prompt one", intent.command.as_str()),
            format!("{} prompt two", intent.command.as_str()),
        ]
    }
}

/// Completes every job immediately with one uniquely named file.
#[derive(Default)]
pub struct StubGateway {
    jobs: AtomicUsize,
}

#[async_trait]
impl MediaGateway for StubGateway {
    async fn upload_image(&self, filename: &str, _bytes: Vec<u8>) -> Option<String> {
        Some(format!("uploaded_{filename}"))
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
        let n = self.jobs.fetch_add(1, Ordering::SeqCst);
        Ok(Some(format!("job-{n}")))
    }

    async fn await_completion(
        &self,
        job_id: &str,
        _poll: PollSettings,
    ) -> Option<Vec<GeneratedOutput>> {
        let filename = format!("{job_id}.png");
        Some(vec![GeneratedOutput {
            kind: MediaKind::from_filename(&filename),
            filename,
            subfolder: String::new(),
        }])
    }
}

pub struct StubSourceStore;

#[async_trait]
impl SourceImageStore for StubSourceStore {
    async fn fetch(&self, _filename: &str) -> Option<Vec<u8>> {
        Some(vec![0x89, b'P', b'N', b'G'])
    }
}

pub fn test_catalog() -> WorkflowCatalog {
    let t2i = json!({
        "3": { "class_type": "KSampler", "inputs": { "seed": "__SEED__" } },
        "6": { "class_type": "CLIPTextEncode", "inputs": { "text": "__PROMPT__" } }
    });
    let i2v = json!({
        "1": { "class_type": "LoadImage", "inputs": { "image": "__IMAGE__" } },
        "2": { "class_type": "WanPrompt", "inputs": { "text": "__PROMPT__", "seed": "__SEED__" } }
    });

    WorkflowCatalog::from_templates([
        WorkflowTemplate::new(
            "Portrait SDXL",
            WorkflowCategory::TextToImage,
            t2i.as_object().unwrap().clone(),
        ),
        WorkflowTemplate::new(
            "Wan I2V",
            WorkflowCategory::ImageToVideo,
            i2v.as_object().unwrap().clone(),
        ),
    ])
    .unwrap()
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build the full application router backed by `pool` and the stubs.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let fast_poll = PollSettings {
        interval: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    };
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(PgTaskLedger::new(pool.clone())),
        Arc::new(StubSynthesizer),
        Arc::new(StubGateway::default()),
        Arc::new(StubSourceStore),
        Arc::new(test_catalog()),
        PipelineSettings {
            image_poll: fast_poll,
            video_poll: fast_poll,
        },
    ));
    let state = AppState::new(pool, config.clone(), orchestrator);
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll `GET /api/v1/tasks/{id}` until the task is terminal.
pub async fn wait_terminal(app: &Router, task_id: i64) -> serde_json::Value {
    for _ in 0..200 {
        let response = get(app.clone(), &format!("/api/v1/tasks/{task_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let status = json["data"]["status"].as_str().unwrap().to_string();
        if status == "completed" || status == "failed" {
            return json["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("task {task_id} did not finish in time");
}
