//! Generation task orchestration.
//!
//! Composes the task ledger, prompt synthesis and the media gateway into
//! the create -> run -> persist pipeline shared by the portrait,
//! illustration and image-to-video services.

pub mod error;
pub mod guard;
pub mod ledger;
pub mod orchestrator;
pub mod runner;
pub mod services;
pub mod source;
pub mod spawn;

pub use error::{LedgerError, OrchestrationError};
pub use guard::ConcurrencyGuard;
pub use ledger::{PgTaskLedger, TaskLedger};
pub use orchestrator::{Orchestrator, PipelineSettings, TaskReceipt};
pub use source::{ComfyUISourceStore, SourceImageStore};
