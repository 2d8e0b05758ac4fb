//! Integration tests for the generation task ledger.
//!
//! Exercises `GenerationTaskRepo` and `ArtifactRepo` against a real database:
//! - Create a pending task with defaults
//! - Status transitions are guarded and never regress
//! - Failing a pending task keeps timestamps ordered
//! - Artifact inserts are idempotent per (kind, subject, filename)
//! - Task tokens are unique

use sqlx::PgPool;
use storyforge_core::media::MediaKind;
use storyforge_db::models::artifact::CreateArtifact;
use storyforge_db::models::status::{TaskKind, TaskStatus};
use storyforge_db::models::task::{CreateGenerationTask, TaskView};
use storyforge_db::repositories::{ArtifactRepo, GenerationTaskRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_task(kind: TaskKind, subject: &str) -> CreateGenerationTask {
    CreateGenerationTask {
        kind,
        subject_key: subject.to_string(),
        task_token: None,
        parameters: serde_json::json!({ "user_intent": "moonlit garden" }),
        requested_count: 2,
    }
}

fn new_artifact(task_id: i64, subject: &str, filename: &str) -> CreateArtifact {
    CreateArtifact {
        task_id,
        kind: TaskKind::Portrait,
        subject_key: subject.to_string(),
        filename: filename.to_string(),
        subfolder: String::new(),
        prompt: Some("a portrait".to_string()),
        media_kind: MediaKind::from_filename(filename),
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_task_is_pending(pool: PgPool) {
    let task = GenerationTaskRepo::create(&pool, &new_task(TaskKind::Portrait, "role-1"))
        .await
        .unwrap();

    assert_eq!(task.status(), TaskStatus::Pending);
    assert_eq!(task.kind(), Some(TaskKind::Portrait));
    assert_eq!(task.requested_count, 2);
    assert_eq!(task.produced_count, 0);
    assert!(task.prompt_list().is_empty());
    assert!(task.started_at.is_none());
    assert_eq!(task.progress_percent(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_lifecycle(pool: PgPool) {
    let task = GenerationTaskRepo::create(&pool, &new_task(TaskKind::Illustration, "ch-3"))
        .await
        .unwrap();

    assert!(GenerationTaskRepo::mark_running(&pool, task.id).await.unwrap());
    GenerationTaskRepo::set_prompts(&pool, task.id, &["p1".to_string(), "p2".to_string()])
        .await
        .unwrap();
    GenerationTaskRepo::set_produced_count(&pool, task.id, 1)
        .await
        .unwrap();

    let running = GenerationTaskRepo::find_by_id(&pool, task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(running.status(), TaskStatus::Running);
    assert_eq!(running.prompt_list(), vec!["p1", "p2"]);
    assert_eq!(running.progress_percent(), 65);

    assert!(GenerationTaskRepo::complete(&pool, task.id, 2, "done")
        .await
        .unwrap());

    let done = GenerationTaskRepo::find_by_id(&pool, task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.status(), TaskStatus::Completed);
    assert_eq!(done.result_message.as_deref(), Some("done"));
    assert!(done.error_message.is_none());
    let started = done.started_at.unwrap();
    let completed = done.completed_at.unwrap();
    assert!(started >= done.created_at);
    assert!(completed >= started);

    let view = TaskView::from(done);
    assert_eq!(view.progress_percent, 100);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_terminal_status_is_absorbing(pool: PgPool) {
    let task = GenerationTaskRepo::create(&pool, &new_task(TaskKind::Portrait, "role-2"))
        .await
        .unwrap();
    GenerationTaskRepo::mark_running(&pool, task.id).await.unwrap();
    assert!(GenerationTaskRepo::fail(&pool, task.id, "boom").await.unwrap());

    // Neither a late completion nor a second start may move it.
    assert!(!GenerationTaskRepo::complete(&pool, task.id, 1, "late")
        .await
        .unwrap());
    assert!(!GenerationTaskRepo::mark_running(&pool, task.id).await.unwrap());

    let row = GenerationTaskRepo::find_by_id(&pool, task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status(), TaskStatus::Failed);
    assert_eq!(row.error_message.as_deref(), Some("boom"));
    assert!(row.result_message.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pending_cannot_complete(pool: PgPool) {
    let task = GenerationTaskRepo::create(&pool, &new_task(TaskKind::Portrait, "role-3"))
        .await
        .unwrap();
    assert!(!GenerationTaskRepo::complete(&pool, task.id, 1, "skip")
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_fail_pending_sets_started_at(pool: PgPool) {
    let task = GenerationTaskRepo::create(&pool, &new_task(TaskKind::Portrait, "role-4"))
        .await
        .unwrap();
    assert!(GenerationTaskRepo::fail(&pool, task.id, "upload failed")
        .await
        .unwrap());

    let row = GenerationTaskRepo::find_by_id(&pool, task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.started_at, row.completed_at);
    assert!(row.started_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_task_token_is_unique(pool: PgPool) {
    let mut input = new_task(TaskKind::ImageToVideo, "seed.png");
    input.task_token = Some("tok-1".to_string());
    GenerationTaskRepo::create(&pool, &input).await.unwrap();

    let err = GenerationTaskRepo::create(&pool, &input).await.unwrap_err();
    match err {
        sqlx::Error::Database(db_err) => {
            assert_eq!(db_err.constraint(), Some("uq_generation_tasks_task_token"));
        }
        other => panic!("Expected unique violation, got {other:?}"),
    }

    let found = GenerationTaskRepo::find_by_token(&pool, "tok-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.subject_key, "seed.png");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_by_subject_newest_first(pool: PgPool) {
    let first = GenerationTaskRepo::create(&pool, &new_task(TaskKind::Portrait, "role-5"))
        .await
        .unwrap();
    let second = GenerationTaskRepo::create(&pool, &new_task(TaskKind::Portrait, "role-5"))
        .await
        .unwrap();
    GenerationTaskRepo::create(&pool, &new_task(TaskKind::Illustration, "role-5"))
        .await
        .unwrap();

    let tasks = GenerationTaskRepo::list_by_subject(&pool, TaskKind::Portrait, "role-5", 10)
        .await
        .unwrap();
    let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_artifact_insert_is_idempotent(pool: PgPool) {
    let task = GenerationTaskRepo::create(&pool, &new_task(TaskKind::Portrait, "role-6"))
        .await
        .unwrap();

    let first = ArtifactRepo::create_if_absent(&pool, &new_artifact(task.id, "role-6", "a.png"))
        .await
        .unwrap();
    assert!(first.is_some());

    let second = ArtifactRepo::create_if_absent(&pool, &new_artifact(task.id, "role-6", "a.png"))
        .await
        .unwrap();
    assert!(second.is_none());

    let rows = ArtifactRepo::list_by_task(&pool, task.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind(), MediaKind::Image);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_same_filename_for_other_subject_is_allowed(pool: PgPool) {
    let task = GenerationTaskRepo::create(&pool, &new_task(TaskKind::Portrait, "role-7"))
        .await
        .unwrap();

    ArtifactRepo::create_if_absent(&pool, &new_artifact(task.id, "role-7", "x.png"))
        .await
        .unwrap();
    let other = ArtifactRepo::create_if_absent(&pool, &new_artifact(task.id, "role-8", "x.png"))
        .await
        .unwrap();
    assert!(other.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_artifact(pool: PgPool) {
    let task = GenerationTaskRepo::create(&pool, &new_task(TaskKind::Portrait, "role-9"))
        .await
        .unwrap();
    let artifact = ArtifactRepo::create_if_absent(&pool, &new_artifact(task.id, "role-9", "v.mp4"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(artifact.kind(), MediaKind::Video);

    assert!(ArtifactRepo::delete(&pool, artifact.id).await.unwrap());
    assert!(!ArtifactRepo::delete(&pool, artifact.id).await.unwrap());
    assert!(ArtifactRepo::list_by_subject(&pool, TaskKind::Portrait, "role-9")
        .await
        .unwrap()
        .is_empty());
}
