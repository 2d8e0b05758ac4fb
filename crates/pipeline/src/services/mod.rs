//! Per-domain orchestration services.
//!
//! Each service maps its request onto a structured synthesis intent and
//! an [`Admission`](crate::orchestrator::Admission), then delegates to the
//! shared [`Orchestrator`](crate::orchestrator::Orchestrator).

pub mod illustration;
pub mod portrait;
pub mod video;

pub use illustration::{IllustrationRequest, IllustrationService};
pub use portrait::{PortraitRequest, PortraitService};
pub use video::{VideoRequest, VideoService};

use storyforge_core::error::CoreError;
use validator::Validate;

use crate::error::OrchestrationError;

/// Run field-level validation on a request DTO.
fn validate_request(request: &impl Validate) -> Result<(), OrchestrationError> {
    request.validate().map_err(CoreError::from)?;
    Ok(())
}
