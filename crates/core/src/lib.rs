//! Shared domain types for the Storyforge generation backend.
//!
//! Pure logic only: identifiers, task state machine enums, progress
//! math, media classification and request validation. Nothing in this
//! crate performs I/O.

pub mod error;
pub mod generation;
pub mod media;
pub mod task;
pub mod types;
