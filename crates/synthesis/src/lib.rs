//! Prompt synthesis client.
//!
//! Turns a structured generation intent into one or more prompts by
//! calling an external workflow-execution service. Every failure mode
//! collapses to an empty prompt list; callers treat "no prompts" as a
//! terminal outcome of the task.

pub mod client;
pub mod intent;
pub mod payload;

pub use client::{PromptSynthesizer, SynthesisClient, SynthesisConfig, SynthesisError};
pub use intent::{StructuredIntent, SynthesisCommand};
pub use payload::SynthesisPayload;
