//! Lookup enums for the `generation_task_statuses` and
//! `generation_task_kinds` tables.
//!
//! The enums live in `storyforge_core::task` so that pure logic (progress,
//! state transitions) can use them without a database dependency.

pub use storyforge_core::task::{StatusId, TaskKind, TaskStatus};
