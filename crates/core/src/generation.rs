//! Generation task constants, progress math, and validation.
//!
//! Shared by the orchestration services (which write task outcomes) and
//! the API layer (which reports progress to polling clients).

use crate::error::CoreError;
use crate::task::TaskStatus;

// ---------------------------------------------------------------------------
// Item counts
// ---------------------------------------------------------------------------

/// Items generated when the caller does not ask for a specific count.
pub const DEFAULT_ITEM_COUNT: i32 = 1;
/// Smallest accepted item count.
pub const MIN_ITEM_COUNT: i32 = 1;
/// Largest accepted item count per task.
pub const MAX_ITEM_COUNT: i32 = 8;

// ---------------------------------------------------------------------------
// Seeds
// ---------------------------------------------------------------------------

/// Lowest seed handed to the generation gateway.
pub const MIN_SEED: u64 = 1;
/// Highest seed handed to the generation gateway.
pub const MAX_SEED: u64 = 999_999_999;

// ---------------------------------------------------------------------------
// Outcome messages
// ---------------------------------------------------------------------------

/// Failure message when prompt synthesis yields nothing usable.
pub const MSG_NO_PROMPTS: &str = "未生成任何提示词";
/// Failure message when every generation attempt failed.
pub const MSG_GENERATION_FAILED: &str = "生成失败";
/// Failure message when the source image could not be handed to the gateway.
pub const MSG_SOURCE_UNAVAILABLE: &str = "源图片上传失败";
/// Message returned when a request collapses onto an in-flight task.
pub const MSG_ALREADY_RUNNING: &str = "该资源已有生成任务在进行中";
/// Message returned when a new task has been accepted.
pub const MSG_TASK_CREATED: &str = "任务已创建，正在后台生成";

/// Result message for a completed task.
pub fn completed_message(produced: i32) -> String {
    format!("成功生成 {produced} 个结果")
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress reported once a task is running but has no prompts yet.
pub const PROGRESS_SYNTHESIZING: i16 = 10;
/// Progress reported once prompts exist and generation begins.
pub const PROGRESS_PROMPTS_READY: i16 = 30;
/// Ceiling for a running task; 100 is reserved for `completed`.
pub const PROGRESS_RUNNING_MAX: i16 = 99;

/// Derive the progress percentage shown to polling callers.
///
/// - `pending` / `failed` -> 0
/// - `completed` -> 100
/// - `running` without prompts -> 10
/// - `running` with prompts -> 30 plus the produced share of the
///   remaining 70, capped at 99
pub fn progress_percent(
    status: TaskStatus,
    has_prompts: bool,
    produced: i32,
    requested: i32,
) -> i16 {
    match status {
        TaskStatus::Pending | TaskStatus::Failed => 0,
        TaskStatus::Completed => 100,
        TaskStatus::Running if !has_prompts => PROGRESS_SYNTHESIZING,
        TaskStatus::Running => {
            if requested <= 0 {
                return PROGRESS_PROMPTS_READY;
            }
            let produced = produced.clamp(0, requested) as i64;
            let span = (100 - PROGRESS_PROMPTS_READY) as i64;
            let pct = PROGRESS_PROMPTS_READY as i64 + span * produced / requested as i64;
            pct.min(PROGRESS_RUNNING_MAX as i64) as i16
        }
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Resolve an optional requested count, rejecting values out of range.
pub fn resolve_item_count(requested: Option<i32>) -> Result<i32, CoreError> {
    let count = requested.unwrap_or(DEFAULT_ITEM_COUNT);
    if !(MIN_ITEM_COUNT..=MAX_ITEM_COUNT).contains(&count) {
        return Err(CoreError::Validation(format!(
            "count must be between {MIN_ITEM_COUNT} and {MAX_ITEM_COUNT}, got {count}"
        )));
    }
    Ok(count)
}

/// Reject a blank required text field.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
